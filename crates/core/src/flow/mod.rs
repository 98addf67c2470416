//! Flow-field time series and their reversal

pub mod frame;
pub mod io;
pub mod reverse;

pub use frame::{
    FlowFieldFrame, FlowFieldTimeSeries, StressPeriod, TimeDiscretization, TimeSpan, TimeStep,
};
pub use io::{read_series, reverse_file, write_series};
pub use reverse::{reverse, FlowFieldReverser};

//! JSON persistence of flow-field series files

use super::frame::FlowFieldTimeSeries;
use super::reverse::reverse;
use crate::error::ReversalError;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Read and validate a series file
pub fn read_series(path: &Path) -> Result<FlowFieldTimeSeries, ReversalError> {
    let file = File::open(path).map_err(|source| ReversalError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let series: FlowFieldTimeSeries =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ReversalError::Format {
            path: path.to_path_buf(),
            source,
        })?;
    series.validate()?;
    Ok(series)
}

/// Write a series file
pub fn write_series(path: &Path, series: &FlowFieldTimeSeries) -> Result<(), ReversalError> {
    let io_err = |source| ReversalError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, series).map_err(|source| ReversalError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)
}

/// Reverse the series in `src` and write it to `dst` in the same format
pub fn reverse_file(src: &Path, dst: &Path) -> Result<FlowFieldTimeSeries, ReversalError> {
    let series = read_series(src)?;
    let reversed = reverse(&series)?;
    write_series(dst, &reversed)?;
    info!(
        "Wrote reversed flow field {} -> {}",
        src.display(),
        dst.display()
    );
    Ok(reversed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::frame::{FlowFieldFrame, TimeSpan};

    fn series() -> FlowFieldTimeSeries {
        FlowFieldTimeSeries::new(vec![
            FlowFieldFrame {
                stress_period: 1,
                time_step: 1,
                span: TimeSpan::new(0.0, 250.0),
                head: vec![320.0, 319.0],
                face_flux: vec![vec![1.5, -1.5], vec![0.25, 0.0]],
            },
            FlowFieldFrame {
                stress_period: 2,
                time_step: 1,
                span: TimeSpan::new(250.0, 1000.0),
                head: vec![318.0, 317.5],
                face_flux: vec![vec![2.0, -2.0], vec![0.5, 0.0]],
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_reverse_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("gwf.flow.json");
        let dst = dir.path().join("gwf_bkwd.flow.json");
        let back = dir.path().join("gwf_fwd.flow.json");

        write_series(&src, &series()).unwrap();
        let reversed = reverse_file(&src, &dst).unwrap();
        assert_eq!(read_series(&dst).unwrap(), reversed);
        assert_eq!(reversed.frames[0].span, TimeSpan::new(0.0, 750.0));

        reverse_file(&dst, &back).unwrap();
        assert_eq!(read_series(&back).unwrap(), series());
    }

    #[test]
    fn test_geometric_steps_file_round_trip() {
        use crate::flow::frame::{StressPeriod, TimeDiscretization};

        let tdis = TimeDiscretization::new(vec![
            StressPeriod::new(0.1, 1, 1.0),
            StressPeriod::new(999.9, 3, 1.5),
        ]);
        let series = FlowFieldTimeSeries::steady(&tdis, &[1.0], &[vec![0.5, -0.5]]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("gwf.flow.json");
        let dst = dir.path().join("gwf_bkwd.flow.json");
        let back = dir.path().join("gwf_fwd.flow.json");
        write_series(&src, &series).unwrap();
        reverse_file(&src, &dst).unwrap();
        reverse_file(&dst, &back).unwrap();
        assert_eq!(read_series(&back).unwrap(), series);
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(read_series(&missing), Err(ReversalError::Io { .. })));

        let garbled = dir.path().join("garbled.json");
        std::fs::write(&garbled, "{\"frames\": [").unwrap();
        assert!(matches!(read_series(&garbled), Err(ReversalError::Format { .. })));

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, "{\"frames\": []}").unwrap();
        assert!(matches!(read_series(&empty), Err(ReversalError::Empty)));
    }
}

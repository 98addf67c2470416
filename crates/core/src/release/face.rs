//! Cell faces and per-face release subdivisions

use crate::core_types::Vec3;
use serde::{Deserialize, Serialize};

/// Cell face in local-coordinate terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Face {
    /// Face 1, local x = 0
    West,
    /// Face 2, local x = 1
    East,
    /// Face 3, local y = 0
    South,
    /// Face 4, local y = 1
    North,
    /// Face 5, local z = 0
    Bottom,
    /// Face 6, local z = 1
    Top,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::West,
        Face::East,
        Face::South,
        Face::North,
        Face::Bottom,
        Face::Top,
    ];

    /// 1-based face number used by the tracking models
    pub const fn number(self) -> u8 {
        match self {
            Face::West => 1,
            Face::East => 2,
            Face::South => 3,
            Face::North => 4,
            Face::Bottom => 5,
            Face::Top => 6,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.number() == number)
    }

    pub const fn is_side(self) -> bool {
        !matches!(self, Face::Bottom | Face::Top)
    }

    /// Local point on this face for fractional position (`u` along rows, `v` along columns)
    ///
    /// Side faces run rows vertically and columns horizontally; bottom and top
    /// run rows along y and columns along x.
    pub fn local_point(self, u: f64, v: f64) -> Vec3 {
        match self {
            Face::West => Vec3::new(0.0, v, u),
            Face::East => Vec3::new(1.0, v, u),
            Face::South => Vec3::new(v, 0.0, u),
            Face::North => Vec3::new(v, 1.0, u),
            Face::Bottom => Vec3::new(v, u, 0.0),
            Face::Top => Vec3::new(v, u, 1.0),
        }
    }
}

/// rows × columns release grid on one face; zero in either skips the face
///
/// For side faces rows are vertical divisions and columns horizontal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FaceSubdivision {
    pub rows: usize,
    pub columns: usize,
}

impl FaceSubdivision {
    pub const NONE: Self = Self {
        rows: 0,
        columns: 0,
    };

    pub const fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns }
    }

    pub const fn count(self) -> usize {
        self.rows * self.columns
    }

    /// Division-center points on `face`, rows before columns
    pub fn points(self, face: Face) -> impl Iterator<Item = Vec3> {
        let (rows, columns) = (self.rows, self.columns);
        (0..rows).flat_map(move |i| {
            (0..columns).map(move |j| {
                let u = (i as f64 + 0.5) / rows as f64;
                let v = (j as f64 + 0.5) / columns as f64;
                face.local_point(u, v)
            })
        })
    }
}

/// Independent subdivisions for all six faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FaceSubdivisions {
    #[serde(default)]
    pub west: FaceSubdivision,
    #[serde(default)]
    pub east: FaceSubdivision,
    #[serde(default)]
    pub south: FaceSubdivision,
    #[serde(default)]
    pub north: FaceSubdivision,
    #[serde(default)]
    pub bottom: FaceSubdivision,
    #[serde(default)]
    pub top: FaceSubdivision,
}

impl FaceSubdivisions {
    /// Same subdivision on the four side faces, none on top and bottom
    pub fn sides(vertical: usize, horizontal: usize) -> Self {
        let side = FaceSubdivision::new(vertical, horizontal);
        Self {
            west: side,
            east: side,
            south: side,
            north: side,
            ..Self::default()
        }
    }

    pub fn with_face(mut self, face: Face, subdivision: FaceSubdivision) -> Self {
        *self.get_mut(face) = subdivision;
        self
    }

    pub fn get(&self, face: Face) -> FaceSubdivision {
        match face {
            Face::West => self.west,
            Face::East => self.east,
            Face::South => self.south,
            Face::North => self.north,
            Face::Bottom => self.bottom,
            Face::Top => self.top,
        }
    }

    fn get_mut(&mut self, face: Face) -> &mut FaceSubdivision {
        match face {
            Face::West => &mut self.west,
            Face::East => &mut self.east,
            Face::South => &mut self.south,
            Face::North => &mut self.north,
            Face::Bottom => &mut self.bottom,
            Face::Top => &mut self.top,
        }
    }

    pub fn count(&self) -> usize {
        Face::ALL.iter().map(|&f| self.get(f).count()).sum()
    }

    /// All release points in face order 1..6
    pub fn points(&self) -> Vec<Vec3> {
        Face::ALL
            .iter()
            .flat_map(|&face| self.get(face).points(face))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_face_numbers_round_trip() {
        for face in Face::ALL {
            assert_eq!(Face::from_number(face.number()), Some(face));
        }
        assert_eq!(Face::from_number(0), None);
        assert!(Face::North.is_side());
        assert!(!Face::Top.is_side());
    }

    #[test]
    fn test_side_face_points() {
        let points: Vec<Vec3> = FaceSubdivision::new(2, 4).points(Face::East).collect();
        assert_eq!(points.len(), 8);
        assert!(points.iter().all(|p| p.x == 1.0));
        // First row is the lower one, columns advance along y
        assert_relative_eq!(points[0].z, 0.25);
        assert_relative_eq!(points[0].y, 0.125);
        assert_relative_eq!(points[1].y, 0.375);
        assert_relative_eq!(points[4].z, 0.75);
    }

    #[test]
    fn test_skipped_faces_and_order() {
        let faces = FaceSubdivisions::sides(10, 10)
            .with_face(Face::Top, FaceSubdivision::new(4, 4))
            .with_face(Face::South, FaceSubdivision::new(3, 0));
        assert_eq!(faces.count(), 316);

        let points = faces.points();
        assert_eq!(points.len(), 316);
        assert_eq!(points[0].x, 0.0);
        assert_eq!(points[100].x, 1.0);
        assert_eq!(points[200].y, 1.0);
        assert_eq!(points[315].z, 1.0);
    }
}

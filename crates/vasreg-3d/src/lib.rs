#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Fast point feature histograms.
pub mod features;

/// Spatial index over point clouds.
pub mod kdtree;

/// Linear algebra utilities.
pub mod linalg;

/// Conversion of volumetric masks to point clouds.
pub mod mask;

/// Surface normal assignment.
pub mod normals;

/// Operations on 3D data processing.
pub mod ops;

/// Point cloud container.
pub mod pointcloud;

/// Poisson-disk subsampling.
pub mod sampling;

/// 3D transforms algorithms.
pub mod transforms;

/// Voxel grid downsampling.
pub mod voxel_grid;

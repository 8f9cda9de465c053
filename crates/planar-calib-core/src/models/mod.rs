//! Pinhole camera model: intrinsics, distortion placeholder, extrinsics and
//! projection.

mod distortion;
mod intrinsics;
mod pose;
mod projection;

pub use distortion::*;
pub use intrinsics::*;
pub use pose::*;
pub use projection::*;

//! # Parameters
//!
//! Typed observable values grouped into scene objects.
//!
//! ```text
//! local edit ──set()──────────▶ value ──▶ ParameterChange ──▶ subscribers
//! remote update ──apply_silent()──▶ value      (no notification)
//! ```

mod object;
mod param;
mod value;

pub use object::{
    ObjectKind, SceneObject, CAMERA_APERTURE, CAMERA_ASPECT, CAMERA_FAR, CAMERA_FOCAL_DISTANCE,
    CAMERA_FOV, CAMERA_NEAR, LIGHT_COLOR, LIGHT_INTENSITY, LIGHT_RANGE, LIGHT_SPOT_ANGLE, POSITION,
    ROTATION, SCALE,
};
pub use param::{AbstractParameter, ObjectId, Parameter, ParameterChange, ParameterId};
pub use value::{ParameterData, ParameterType, ParameterValue};

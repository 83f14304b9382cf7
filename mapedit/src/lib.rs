//! Map coordinate transforms and interactive waypoint / keepout-zone
//! editing for the patrol dashboard.

pub mod config;
pub mod coords;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod messages;
pub mod model;
pub mod pose;
pub mod render;
pub mod route;
pub mod session;
pub mod view;
pub mod viewport;

pub use config::{EditorConfig, ViewConfig};
pub use coords::CoordinateMapper;
pub use editor::{EditKey, EditorState, GeometryEditor, PointerEvent, PointerKind, Tool};
pub use error::{MessageError, RenderError, RouteError};
pub use geometry::{CanvasPos, MapPixel, WorldPos};
pub use messages::MessageKind;
pub use model::{EntityId, KeepoutZone, MapInfo, MapModel, Origin, Point, PointRef};
pub use pose::RobotPose;
pub use render::{Color, Dash, RenderOptions, Stroke, Surface};
pub use route::RouteExport;
pub use session::Session;
pub use view::{ViewState, ViewTransform, ZoomAnchor};
pub use viewport::Viewport;

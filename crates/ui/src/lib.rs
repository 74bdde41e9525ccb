//! PDF Reader UI Library
//!
//! Screen-side interaction layer: the page pager with its pan, pinch and
//! fling physics, interaction modes, and the gesture router that turns a
//! raw pointer stream into ink, selection, manipulation and navigation.

pub mod drawing_router;
pub mod event;
pub mod longpress;
pub mod mode;
pub mod pager;
pub mod persistence;
pub mod router;
pub mod scroller;
pub mod selection;
pub mod stylus;
pub mod transform;
pub mod viewport;

pub use drawing_router::{DrawingGestureRouter, InkAction, StrokeMode};
pub use event::{Notice, PointerAction, PointerEvent, ReaderEvent, ReaderTimer, ToolKind};
pub use mode::{InteractionMode, ModeChange, ModeController, ModeDecision, ModeInterceptor};
pub use pager::{ChildFrame, PageAdapter, PageSurface, Pager, PagerConfig, PagerEvent, PagerState};
pub use persistence::{PersistError, PersistResult, ReaderState, SavedState, STATE_VERSION};
pub use router::{place_text_box, GestureRouter, OverlayState, RouterPorts};
pub use transform::{screen_to_doc, Container, ScreenFrame};

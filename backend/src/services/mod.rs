pub mod desk;
pub mod live_query;
pub mod session;

pub use desk::{LeaveDesk, RequestCard, Workspace, WorkspaceView};
pub use live_query::LiveQuery;
pub use session::{SessionBootstrap, SessionState, SessionStatus};

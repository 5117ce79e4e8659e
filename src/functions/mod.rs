//! 入口函数：HTTP 会话、定时清理、队列消息、文档变更流

pub mod change_feed;
#[cfg(feature = "http")]
pub mod http;
pub mod queue;
pub mod shutdown;
pub mod timer;

pub use change_feed::process_change_feed;
#[cfg(feature = "http")]
pub use http::{parse_conversation_request, router, HttpState, RequestError};
pub use queue::{process_queue_message, QueueError, QueueReceipt};
pub use shutdown::{shutdown_on, shutdown_on_ctrl_c};
pub use timer::{spawn_timer_cleanup, timer_cleanup, TimerTick};

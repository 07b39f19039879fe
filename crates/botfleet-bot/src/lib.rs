pub mod bot;
pub mod flags;
pub mod pathing;
pub mod rpc;

pub use bot::{Bot, OutboundMessage};
pub use flags::{BotFlag, BotFlags, Dialog, DialogStyle, MoveType, MovepathStatus};
pub use pathing::find_path;

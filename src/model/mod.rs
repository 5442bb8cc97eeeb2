//! Immutable value objects parsed from upstream wire JSON.
//!
//! Each entity is constructed once at its parse site and never mutated;
//! unknown wire fields are ignored and missing optional fields become `None`.

pub use self::application::*;
pub use self::attachment::*;
pub use self::channel::*;
pub use self::color::*;
pub use self::embed::*;
pub use self::guild::*;
pub use self::invite::*;
pub use self::message::*;
pub use self::reaction::*;
pub use self::role::*;
pub use self::sticker::*;
pub use self::user::*;

/// Defines the application entity and its intent flags.
mod application;
/// Defines the attachment entity and its media predicates.
mod attachment;
/// Defines the channel entity, kinds, and range predicates.
mod channel;
/// Defines a structure that represents an RGB color.
mod color;
/// Defines embed entities and their normalisation.
mod embed;
/// Defines the guild entity.
mod guild;
/// Defines the invite entity.
mod invite;
/// Defines the message entity, kinds, and flags.
mod message;
/// Defines reaction and emoji entities.
mod reaction;
/// Defines the role entity.
mod role;
/// Defines the sticker entity.
mod sticker;
/// Defines user and member entities.
mod user;

//! MocapRelay manages many independent, unreliable, long-lived connections
//! to wearable motion sensors, normalizes their wire payloads into a shared
//! orientation state, and lets that state be recorded and replayed
//! deterministically.
//!
//! The [`registry::ConnectionRegistry`] is the single source of truth: UI
//! commands mutate it, the [`recorder::Recorder`] samples it at a fixed
//! cadence, the [`player::Player`] writes recorded frames back into it, and
//! the rendering layer reads a [`registry::ConnectionRegistry::snapshot`]
//! every frame. One device failing, timing out, or dropping off never takes
//! the process with it; faults stay inside that device's connection and
//! surface as [`event::RelayEvent`]s.
//!
//! The rendering layer, the UI control surface, and the stateless UDP
//! forwarder live elsewhere; this crate only deals in exact target-name
//! keys and raw rotation components.

#![warn(missing_docs)]
#[allow(missing_docs)]
pub mod args;
pub mod connection;
pub mod dummy_sensor;
pub mod endpoint;
pub mod event;
pub mod orientation;
pub mod player;
pub mod recorder;
pub mod registry;
pub mod session;
pub mod transport;
pub mod wire;

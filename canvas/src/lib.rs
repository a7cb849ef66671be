//! Interaction core for the shared design canvas.
//!
//! This crate turns raw pointer events into shape mutations for a canvas that
//! many clients edit at once. It owns the per-tool state machine, the
//! advisory lock protocol, the interaction session for each gesture, and the
//! load-adaptive throttle for ephemeral position broadcasts. It performs no
//! I/O: every input returns [`engine::Action`]s that the host carries out
//! against its durable and ephemeral stores, and feeds their results back.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | [`engine::EngineCore`], actions, feeds and merged views |
//! | [`tools`] | One handler per tool and the shared gesture plumbing |
//! | [`session`] | The interaction session for one gesture |
//! | [`throttle`] | Coalescing, rate limiting and sampling of transient frames |
//! | [`lock`] | Ownership rules and stale-lock detection |
//! | [`input`] | Tools, pointer events, input and UI state |
//! | [`hit`] | Hit-testing against shapes and handles |
//! | [`geometry`] | Rectangles, clamping, resize crossover, angles |
//! | [`doc`] | Shape model and the local shape cache |
//! | [`camera`] | Pan/zoom viewport and coordinate conversions |
//! | [`config`] | Tunable limits |
//! | [`consts`] | Shared numeric constants |

pub mod camera;
pub mod config;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod geometry;
pub mod hit;
pub mod input;
pub mod lock;
pub mod session;
pub mod throttle;
pub mod tools;

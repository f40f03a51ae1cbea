//! Coordinate-transformation and snapping engine for georeferenced site maps.
//!
//! This crate sits underneath a field-survey mapping UI. It turns GPS fixes
//! into pixels on a georeferenced document (and back), parses site drawings
//! into typed vector entities, indexes their vertices and edges for snapping,
//! and accumulates tap points into live distance/area measurements. The host
//! application owns rendering, gestures, persistence, and file I/O; it feeds
//! this crate a georeference record, vector text, and pan/zoom state.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`coords`] | Point types for each coordinate space and control-point pairs |
//! | [`crs`] | Geodetic <-> projected conversion (UTM, TM, Lambert, Mercator, geographic) |
//! | [`affine`] | Least-squares affine fit and the invertible 2-D transform |
//! | [`vector`] | Group-code vector stream parser and bounding boxes |
//! | [`snap`] | Grid index for vertex/segment snapping and its shared handle |
//! | [`pipeline`] | GPS <-> pixel <-> screen pipeline over immutable snapshots |
//! | [`interaction`] | Mode state machine and live measurements |
//! | [`georef`] | Georeference record consumed from the metadata reader |
//! | [`worker`] | Background load tasks that publish snapshots |
//! | [`config`] | Environment-driven defaults |
//! | [`error`] | Error taxonomy shared by every module |
//! | [`consts`] | Shared numeric constants (ellipsoid, tolerances, defaults) |

pub mod affine;
pub mod config;
pub mod consts;
pub mod coords;
pub mod crs;
pub mod error;
pub mod georef;
pub mod interaction;
pub mod pipeline;
pub mod snap;
pub mod vector;
pub mod worker;

pub use error::GeoError;

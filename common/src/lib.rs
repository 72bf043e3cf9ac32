//! Shared data model and mapper contract for control-kit.
//!
//! This crate provides:
//! - The open value model and tolerant lookups (`value`)
//! - Occurrence and attestation builders (`occurrence`)
//! - Display output and the violations column schema (`display`)
//! - Structural shape checking (`shape`)
//! - The detail/display mapper traits and control registration (`mapper`)

pub mod display;
pub mod error;
pub mod mapper;
pub mod occurrence;
pub mod shape;
pub mod value;

pub use display::{ColumnDefinition, ColumnType, DisplayOutput, Violations};
pub use error::{MapperError, MapperResult};
pub use mapper::{
    Control, ControlBuilder, DetailMapper, DisplayMapper, FnDetailMapper, FnDisplayMapper,
    DETAIL_PARAMETERS, DISPLAY_PARAMETERS,
};
pub use occurrence::{splice_detail, Attestation, AttestationResult, Occurrence};
pub use shape::{display_shape, occurrence_shape, Field, Shape, ShapeViolation};
pub use value::{Mapping, ValueKind};

/// Version information for the common crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

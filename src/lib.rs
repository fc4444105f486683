// Enable pedantic lints globally, then allow the noisy ones we're not fixing.
#![warn(clippy::pedantic, clippy::nursery)]
// --- Intentionally allowed ---
// Not a public API consumed outside this crate's own binary.
#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]
// FFT/DSP variable names (fij vs fkl vs fsum) are intentionally similar.
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
// Pixel/index arithmetic performs intentional casts throughout.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::cast_possible_wrap
)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(
    clippy::module_name_repetitions,
    clippy::items_after_statements,
    clippy::option_if_let_else,
    clippy::doc_markdown,
    clippy::float_cmp,
    clippy::match_same_arms,
    clippy::struct_field_names,
    clippy::needless_pass_by_value,
    clippy::unnecessary_wraps,
    clippy::if_not_else,
    clippy::match_wildcard_for_single_variants,
    clippy::single_match_else,
    clippy::unnested_or_patterns,
    clippy::trivially_copy_pass_by_ref
)]
#![allow(clippy::redundant_pub_crate, clippy::significant_drop_tightening)]

//! Speckle-masking image reconstruction: recovers a diffraction-limited
//! image from turbulence-degraded video by combining Labeyrie power-spectrum
//! averaging with Weigelt bispectrum phase reconstruction.

pub mod array2;
pub mod bispectrum;
pub mod crosscorrelation;
pub mod error;
pub mod fft;
pub mod image_sink;
pub mod phase;
pub mod pipeline;
pub mod settings;
pub mod video;
pub mod window;

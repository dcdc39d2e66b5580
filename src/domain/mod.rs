// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the core
// concepts: interaction records, examples, prompt pairs and
// the errors the pipeline can raise.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - NO randomness
//
// Everything here can be unit tested without a GPU or a
// dataset on disk.

// Interaction records and column-aligned sequences
pub mod record;

// Raw logs, id maps and metadata as read from disk
pub mod raw;

// (input window, target) examples and render arguments
pub mod example;

// The (input_text, target_text) pair
pub mod prompt;

// Split / sample / render error taxonomy
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;

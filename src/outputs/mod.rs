//! Output generation for the static briefing site.
//!
//! # Submodules
//!
//! - [`html`]: Renders news sections, price tables, and insight blocks as
//!   HTML fragments
//! - [`report`]: Assembles the fragments into a [`report::DailyReport`] and
//!   writes it under the docs data directory, keeping `index.json` current
//!
//! # Output Structure
//!
//! ```text
//! docs_dir/
//! └── data/
//!     ├── index.json          # {"dates": ["2026-08-29", ...]}
//!     ├── 2026-08-29.json
//!     └── 2026-08-28.json
//! ```

pub mod html;
pub mod report;

//! Dense N-dimensional views of summary datasets.
//!
//! A [`CrossTab`] takes the discrete columns of a dataset as its axes and
//! turns every scalar column into a [`MaskedTable`] shaped by those axes.
//! Cells that no row reaches are masked, not zero. Two crosstabs over
//! different axes are reconciled by summing out the axes one lacks
//! ([`CrossTab::collapse_axes_not_in`]) or broadcasting along the axes it
//! lacks ([`CrossTab::replicate_axes`]).

pub mod axis;
pub mod crosstab;
pub mod table;

pub use axis::{CrossTabAxis, shape_union};
pub use crosstab::{CrossTab, CrossTabExt, CrossTabTable};
pub use table::MaskedTable;

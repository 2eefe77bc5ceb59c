#![warn(missing_docs)]
//! Utility methods for the weaver suite of libraries.
//!
//! Provides a few simple string helpers and the [`ErrorReport`] trait, which every weaver error implements.
//! With the `error_printing` feature enabled, any [`ErrorReport`] can be rendered against its source text.

use std::ops::Range;

use itertools::Itertools;

/// A byte range in some source text.
pub type Span = Range<usize>;

/// Errors that know how to describe themselves to a human.
///
/// The message is split in two parts: a short head (`"Unexpected token!"`) and a longer explanation.
/// The span points at the part of the source that caused the error.
pub trait ErrorReport {
	/// A tuple of the head and the message of this error.
	fn msg(&self) -> (String, String);
	/// The span in the source text this error refers to.
	fn span(&self) -> Span;
	/// Both [`ErrorReport::msg`] and [`ErrorReport::span`] in one go.
	fn msg_and_span(&self) -> ((String, String), Span) {
		(self.msg(), self.span())
	}
}

/// Given a slice of strings, return a string that has all the values joined by a `,`. Except for the last which is joined by ` or `.
/// # Example
/// ```
/// # use weaver_utils::comma_separated_with_or;
/// let v = vec!["1".to_string(), "2".to_string(), "3".to_string()];
/// assert_eq!("1, 2 or 3", comma_separated_with_or(&v));
/// ```
#[must_use]
pub fn comma_separated_with_or(strings: &[String]) -> String {
	match strings.split_last() {
		None => String::new(),
		Some((last, [])) => last.clone(),
		Some((last, rest)) => format!("{} or {last}", rest.iter().join(", ")),
	}
}

/// Same as [`vec!`] but calls `to_string()` on all the elements.
#[macro_export]
macro_rules! string_vec {
	( $( $x:expr ),* ) => {
		vec![$($x.to_string(),)*]
	};
}

#[cfg(feature = "error_printing")]
mod printing {
	use ariadne::{ColorGenerator, Config, Label, Report, ReportKind, Source};

	use super::ErrorReport;

	fn build<'a>(err: &impl ErrorReport, file_path: &'a str, color: bool) -> Report<'a, (&'a str, super::Span)> {
		let mut colors = ColorGenerator::new();
		let a = colors.next();
		let ((head, msg), span) = err.msg_and_span();
		Report::build(ReportKind::Error, file_path, span.start)
			.with_config(Config::default().with_color(color))
			.with_message(head)
			.with_label(
				Label::new((file_path, span))
					.with_message(msg)
					.with_color(a),
			)
			.finish()
	}

	/// Render an error against the source text it refers to, without colors.
	///
	/// # Errors
	/// Returns an [`std::io::Error`] if writing the report fails.
	pub fn render_report(err: &impl ErrorReport, file_path: &str, source: &str) -> std::io::Result<String> {
		let mut buffer = Vec::new();
		build(err, file_path, false).write((file_path, Source::from(source.to_owned())), &mut buffer)?;
		Ok(String::from_utf8_lossy(&buffer).into_owned())
	}

	/// Print an error to stderr, annotated against the source text.
	///
	/// # Errors
	/// Returns an [`std::io::Error`] if printing the report fails.
	pub fn print_report(err: &impl ErrorReport, file_path: &str, source: &str) -> std::io::Result<()> {
		build(err, file_path, true).eprint((file_path, Source::from(source.to_owned())))
	}
}

#[cfg(feature = "error_printing")]
pub use printing::{print_report, render_report};

use std::fmt::Display;

use crate::error::{GllError, GllResult};

/// Options for a single parse.
///
/// The defaults use lookahead and place no bounds on the session. Worst-case GLL is cubic in both time and
/// space, so callers parsing untrusted input with untrusted grammars should set the `max_*` limits.
///
/// # Example
/// ```
/// use weaver_gll::ParseConfig;
///
/// let config = ParseConfig::default().with_max_sppf_nodes(10_000).with_lookahead(false);
/// assert_eq!(Some(10_000), config.max_sppf_nodes);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
	/// Consult the FIRST/FOLLOW test set of a slot before scheduling an alternative or calling a nonterminal.
	pub lookahead: bool,
	/// The maximum amount of GSS nodes a session may create.
	pub max_gss_nodes: Option<usize>,
	/// The maximum amount of SPPF nodes (packed nodes included) a session may create.
	pub max_sppf_nodes: Option<usize>,
	/// The maximum amount of distinct descriptors a session may schedule.
	pub max_descriptors: Option<usize>,
}

impl Default for ParseConfig {
	fn default() -> Self {
		Self { lookahead: true, max_gss_nodes: None, max_sppf_nodes: None, max_descriptors: None }
	}
}

impl ParseConfig {
	/// Turn lookahead tests on or off.
	#[must_use]
	pub const fn with_lookahead(mut self, lookahead: bool) -> Self {
		self.lookahead = lookahead;
		self
	}

	/// Bound the amount of GSS nodes.
	#[must_use]
	pub const fn with_max_gss_nodes(mut self, limit: usize) -> Self {
		self.max_gss_nodes = Some(limit);
		self
	}

	/// Bound the amount of SPPF nodes.
	#[must_use]
	pub const fn with_max_sppf_nodes(mut self, limit: usize) -> Self {
		self.max_sppf_nodes = Some(limit);
		self
	}

	/// Bound the amount of descriptors.
	#[must_use]
	pub const fn with_max_descriptors(mut self, limit: usize) -> Self {
		self.max_descriptors = Some(limit);
		self
	}

	const fn limit(&self, resource: Resource) -> Option<usize> {
		match resource {
			Resource::GssNodes => self.max_gss_nodes,
			Resource::SppfNodes => self.max_sppf_nodes,
			Resource::Descriptors => self.max_descriptors,
		}
	}

	/// Error out if `used` exceeds the configured limit for `resource`.
	pub(crate) fn check(&self, resource: Resource, used: usize) -> GllResult<()> {
		match self.limit(resource) {
			Some(limit) if used > limit => Err(GllError::ResourceExhausted { resource, limit }),
			_ => Ok(()),
		}
	}
}

/// The things a parse session can run out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
	/// Nodes in the graph-structured stack.
	GssNodes,
	/// Nodes in the shared packed parse forest.
	SppfNodes,
	/// Scheduled descriptors.
	Descriptors,
}

impl Display for Resource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::GssNodes => write!(f, "GSS nodes"),
			Self::SppfNodes => write!(f, "SPPF nodes"),
			Self::Descriptors => write!(f, "descriptors"),
		}
	}
}

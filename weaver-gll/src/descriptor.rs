use crate::{gss::GssNodeIndex, slot::SlotId, sppf::SppfNodeIndex};

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
/// A GLL Descriptor: a unit of pending work.
///
/// Processing it means continuing at `slot`, with `gss` as the current call, at input `position`, having parsed
/// `sppf` so far.
pub(crate) struct Descriptor {
	/// The slot of this descriptor.
	pub(crate) slot: SlotId,
	/// The gss node this descriptor belongs to.
	pub(crate) gss: GssNodeIndex,
	/// The input pointer when this descriptor was made.
	pub(crate) position: usize,
	/// The sppf node this descriptor belongs to.
	pub(crate) sppf: SppfNodeIndex,
}

impl Descriptor {
	pub(crate) const fn new(slot: SlotId, gss: GssNodeIndex, position: usize, sppf: SppfNodeIndex) -> Self {
		Self { slot, gss, position, sppf }
	}
}

pub(crate) mod handoff;

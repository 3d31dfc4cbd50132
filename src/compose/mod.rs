pub(crate) mod assemble;
pub(crate) mod blend;
pub(crate) mod image;
pub(crate) mod order;
pub(crate) mod serial;

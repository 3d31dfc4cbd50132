pub(crate) mod render_pass;

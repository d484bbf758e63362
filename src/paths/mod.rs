//! Path classification for content roots.

mod resolver;

pub use resolver::{
    has_content, is_flat_root, module_dirs, resolve_bmad_path, CONTENT_DIRS, NESTED_ROOT_DIR,
    PREBUILT_MANIFEST_DIR,
};

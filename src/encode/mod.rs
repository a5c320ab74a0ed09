use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::ViewerResult;

pub mod gif;

/// Create the directory an output file will land in.
pub(crate) fn ensure_parent_dir(path: &Path) -> ViewerResult<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("create output directory '{}'", parent.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_dirs_are_created_and_bare_names_pass() {
        let path = Path::new("target").join("encode_unit").join("nested").join("out.gif");
        let _ = std::fs::remove_dir_all(Path::new("target").join("encode_unit"));
        ensure_parent_dir(&path).unwrap();
        assert!(path.parent().unwrap().is_dir());
        ensure_parent_dir(Path::new("bare.gif")).unwrap();
    }
}

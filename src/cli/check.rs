//! `edgeship check`: report every plan problem without deploying.

use anyhow::{Result, bail};

use super::common::{Compiled, compile};
use crate::config::SiteConfig;
use crate::log;
use crate::plan::check;
use crate::utils::{plural_count, plural_s};

pub fn check_site(config: &SiteConfig) -> Result<()> {
    let Compiled { metadata, plan } = compile(config)?;
    let diag = check(&plan);

    if !diag.is_empty() {
        eprintln!("{diag}");
        bail!(
            "{} problem{} in the deployment plan",
            diag.len(),
            plural_s(diag.len())
        );
    }

    log!(
        "check";
        "ok: {}, {}, {}",
        plural_count(metadata.static_routes.len(), "static route"),
        plural_count(plan.functions.len(), "function"),
        plural_count(plan.behaviors.len(), "behavior")
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Framework;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_check_placeholder_site() {
        let mut config = SiteConfig::default();
        config.site.dev = true;
        assert!(check_site(&config).is_ok());
    }

    #[test]
    fn test_check_missing_build_output() {
        let dir = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.site.framework = Framework::Astro;
        config.site.path = dir.path().to_path_buf();

        let err = check_site(&config).unwrap_err();
        assert!(err.to_string().contains("build output missing"));
    }

    #[test]
    fn test_check_encodes_unusual_file_names() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("public")).unwrap();
        fs::create_dir_all(dir.path().join("build")).unwrap();
        fs::write(dir.path().join("build/index.js"), "").unwrap();
        fs::write(dir.path().join("public/weird name?.txt"), "").unwrap();

        let mut config = SiteConfig::default();
        config.site.path = dir.path().to_path_buf();
        assert!(check_site(&config).is_ok());
    }
}

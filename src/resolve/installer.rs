//! Expansion of installer groups over their release → arch map.

use std::collections::HashSet;

use tracing::debug;

use super::{Overrides, Resolver};
use crate::catalog::{InstallerGroup, ReleaseKey};
use crate::error::CatalogError;
use crate::image::naming::installer_filename;
use crate::image::{ConcreteImage, InstallerImage, Release};

const DEFAULT_ARCH: &str = "x86_64";

/// Expands an installer group.
///
/// A release override replaces the group's map with that single release
/// (arch from the override, else `x86_64`). An arch override alone keeps
/// every release but only that arch.
pub(super) fn expand(
    resolver: &Resolver<'_>,
    group: &InstallerGroup,
    overrides: &Overrides,
) -> Result<Vec<ConcreteImage>, CatalogError> {
    let releases: Vec<(ReleaseKey, Vec<String>)> = match (overrides.release, &overrides.arch) {
        (Some(key), arch) => {
            vec![(key, vec![arch.clone().unwrap_or_else(|| DEFAULT_ARCH.to_string())])]
        }
        (None, Some(arch)) => group
            .releases
            .iter()
            .filter(|(_, arches)| arches.contains(arch))
            .map(|(key, _)| (*key, vec![arch.clone()]))
            .collect(),
        (None, None) => group.releases.clone(),
    };

    let mut seen = HashSet::new();
    let mut images = Vec::new();
    for (key, arches) in releases {
        let Some(release) = resolve_key(resolver, group, key)? else {
            debug!(group = %group.name, "no branched release, skipping");
            continue;
        };
        for arch in arches {
            let filename = installer_filename(&release, &group.name, group.imgver.as_deref(), &arch);
            if !seen.insert(filename.clone()) {
                continue;
            }
            images.push(ConcreteImage::Installer(InstallerImage {
                group: group.name.clone(),
                filename,
                release,
                arch,
                size: group.size,
                variant: group.variant.clone(),
                maxage: group.maxage,
                bootopts: group.bootopts.clone(),
            }));
        }
    }
    Ok(images)
}

/// Turns a release key into a concrete release. `Ok(None)` means the key is
/// `branched` and there is no branched release right now.
fn resolve_key(
    resolver: &Resolver<'_>,
    group: &InstallerGroup,
    key: ReleaseKey,
) -> Result<Option<Release>, CatalogError> {
    match key {
        ReleaseKey::Number(n) => Ok(Some(Release::Number(n))),
        ReleaseKey::Rawhide => Ok(Some(Release::Rawhide)),
        ReleaseKey::Branched => Ok(resolver.branched_release(&group.name)?.map(Release::Number)),
        ReleaseKey::Relative(offset) => {
            let next = resolver.next_release(&group.name)?;
            let resolved = i64::from(next) + offset;
            u32::try_from(resolved)
                .ok()
                .filter(|n| *n > 0)
                .map(|n| Some(Release::Number(n)))
                .ok_or_else(|| CatalogError::ReleaseOutOfRange {
                    group: group.name.clone(),
                    key: offset,
                    next,
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::testing::TestPorts;

    fn group(json: &str) -> InstallerGroup {
        Catalog::from_json(&format!(r#"{{"installer": [{json}]}}"#)).unwrap().installer.remove(0)
    }

    fn names(images: &[ConcreteImage]) -> Vec<&str> {
        images.iter().map(ConcreteImage::filename).collect()
    }

    #[test]
    fn relative_key_uses_next_release_hint() {
        let ports = TestPorts::new();
        let ctx = ports.context();
        let resolver = Resolver::new(&ctx, Some(30));
        let g = group(r#"{"name": "x", "releases": {"-1": ["x86_64"]}, "maxage": 7}"#);
        let images = expand(&resolver, &g, &Overrides::default()).unwrap();
        assert_eq!(names(&images), vec!["disk_f29_x_x86_64.img"]);
        assert_eq!(images[0].max_age_days(), Some(7));
    }

    #[test]
    fn absent_branched_release_is_skipped() {
        let ports = TestPorts::new();
        ports.releases.set(39, None);
        let ctx = ports.context();
        let resolver = Resolver::new(&ctx, None);
        let g = group(r#"{"name": "d", "releases": {"branched": ["x86_64"], "39": ["x86_64"]}}"#);
        let images = expand(&resolver, &g, &Overrides::default()).unwrap();
        assert_eq!(names(&images), vec!["disk_f39_d_x86_64.img"]);
    }

    #[test]
    fn relative_key_without_branched_counts_from_stable() {
        let ports = TestPorts::new();
        ports.releases.set(39, None);
        let ctx = ports.context();
        let resolver = Resolver::new(&ctx, None);
        let g = group(r#"{"name": "x", "releases": {"-2": ["x86_64"]}}"#);
        let images = expand(&resolver, &g, &Overrides::default()).unwrap();
        assert_eq!(names(&images), vec!["disk_f38_x_x86_64.img"]);
    }

    #[test]
    fn relative_key_below_one_is_an_error() {
        let ports = TestPorts::new();
        let ctx = ports.context();
        let resolver = Resolver::new(&ctx, Some(3));
        let g = group(r#"{"name": "x", "releases": {"-3": ["x86_64"]}}"#);
        let err = expand(&resolver, &g, &Overrides::default()).unwrap_err();
        assert!(matches!(err, CatalogError::ReleaseOutOfRange { key: -3, next: 3, .. }), "{err}");
    }

    #[test]
    fn arch_override_filters_releases() {
        let ports = TestPorts::new();
        let ctx = ports.context();
        let resolver = Resolver::new(&ctx, None);
        let g = group(
            r#"{"name": "m", "imgver": "2",
                "releases": {"38": ["x86_64", "aarch64"], "39": ["x86_64"], "rawhide": ["aarch64"]}}"#,
        );
        let overrides = Overrides { arch: Some("aarch64".into()), ..Overrides::default() };
        let images = expand(&resolver, &g, &overrides).unwrap();
        assert_eq!(
            names(&images),
            vec!["disk_f38_m_2_aarch64.img", "disk_frawhide_m_2_aarch64.img"]
        );
    }

    #[test]
    fn release_override_defaults_to_x86_64() {
        let ports = TestPorts::new();
        let ctx = ports.context();
        let resolver = Resolver::new(&ctx, None);
        let g = group(r#"{"name": "m", "releases": {"38": ["aarch64"]}}"#);
        let overrides = Overrides { release: Some(ReleaseKey::Number(40)), ..Overrides::default() };
        let images = expand(&resolver, &g, &overrides).unwrap();
        assert_eq!(names(&images), vec!["disk_f40_m_x86_64.img"]);

        let overrides = Overrides {
            release: Some(ReleaseKey::Number(40)),
            arch: Some("ppc64le".into()),
            ..Overrides::default()
        };
        let images = expand(&resolver, &g, &overrides).unwrap();
        assert_eq!(names(&images), vec!["disk_f40_m_ppc64le.img"]);
    }

    #[test]
    fn keys_resolving_to_the_same_release_collapse() {
        let ports = TestPorts::new();
        ports.releases.set(39, Some(40));
        let ctx = ports.context();
        let resolver = Resolver::new(&ctx, None);
        let g = group(r#"{"name": "d", "releases": {"branched": ["x86_64"], "-1": ["x86_64"]}}"#);
        let images = expand(&resolver, &g, &Overrides::default()).unwrap();
        assert_eq!(names(&images), vec!["disk_f40_d_x86_64.img"]);
    }
}

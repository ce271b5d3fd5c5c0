//! Where an installer build gets its inputs: kickstart file, installation
//! tree, VM sizing, and which arches this host can build at all.

use std::path::Path;

use crate::image::{InstallerImage, Release};
use crate::ports::FileSystem;

/// Installation tree variant used when the group does not name one.
pub const DEFAULT_VARIANT: &str = "Everything";

/// Installer profile used when the host registry has no exact match.
pub const FALLBACK_PROFILE: &str = "fedora-unknown";

const SECONDARY_ARCHES: [&str; 2] = ["ppc64", "ppc64le"];

/// This host's architecture, spelled the way image filenames spell it.
#[must_use]
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "i686",
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
        "powerpc64" => "ppc64",
        "arm" => "armv7l",
        other => other,
    }
}

/// Arches whose installer images can be built on a `host` machine.
#[must_use]
pub fn supported_arches(host: &str) -> &'static [&'static str] {
    match host {
        "ppc64" | "ppc64le" | "noarch" => &["ppc64", "ppc64le", "noarch"],
        "i686" | "x86_64" => &["i686", "x86_64", "noarch"],
        "aarch64" => &["aarch64", "armv7l"],
        _ => &[],
    }
}

/// Most specific kickstart in `script_dir` for the image, by filename.
///
/// Preference: `<name>-<release>-<arch>.ks`, `<name>-<release>.ks`,
/// `<name>-<arch>.ks`, `<name>.ks`.
#[must_use]
pub fn find_kickstart(
    fs: &dyn FileSystem,
    script_dir: &Path,
    image: &InstallerImage,
) -> Option<String> {
    let (name, release, arch) = (&image.group, image.release, &image.arch);
    [
        format!("{name}-{release}-{arch}.ks"),
        format!("{name}-{release}.ks"),
        format!("{name}-{arch}.ks"),
        format!("{name}.ks"),
    ]
    .into_iter()
    .find(|candidate| fs.exists(&script_dir.join(candidate)))
}

/// Installation tree URL for `release` on `arch`.
///
/// Releases newer than `stable` live in the development tree. `i686` is
/// spelled `i386` here and nowhere else.
#[must_use]
pub fn install_location(
    mirror: &str,
    release: Release,
    stable: Option<u32>,
    arch: &str,
    variant: Option<&str>,
) -> String {
    let tree = if SECONDARY_ARCHES.contains(&arch) { "fedora-secondary" } else { "fedora/linux" };
    let arch = if arch == "i686" { "i386" } else { arch };
    let variant = variant.unwrap_or(DEFAULT_VARIANT);
    let branch = match release {
        Release::Rawhide => "development/rawhide".to_string(),
        Release::Number(n) if stable.is_some_and(|stable| n > stable) => format!("development/{n}"),
        Release::Number(n) => format!("releases/{n}"),
    };
    format!("{}/{tree}/{branch}/{variant}/{arch}/os", mirror.trim_end_matches('/'))
}

/// Guest memory in MiB.
#[must_use]
pub fn memory_mib(arch: &str) -> u32 {
    if SECONDARY_ARCHES.contains(&arch) {
        4096
    } else {
        3072
    }
}

/// Short id to look up in the installer profile registry.
#[must_use]
pub fn profile_id(release: Release) -> String {
    match release {
        Release::Number(n) => format!("fedora{n}"),
        Release::Rawhide => "fedora-rawhide".to_string(),
    }
}

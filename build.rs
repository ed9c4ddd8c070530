//! Build script for detecting system dependencies and providing installation guidance.
//!
//! Checks for pkg-config, OpenCV (camera capture, drawing, HighGUI windows) and
//! the ONNX Runtime library used by the landmark models, and prints hints when
//! something is missing.

use std::env;
use std::path::Path;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let has_pkg_config = check_pkg_config();
    check_opencv(has_pkg_config);
    check_onnxruntime(has_pkg_config);

    println!(
        "cargo:rustc-env=BUILD_TARGET={}",
        env::var("TARGET").unwrap_or_default()
    );
}

/// Version of a pkg-config package, if installed
fn pkg_config_version(package: &str) -> Option<String> {
    let output = Command::new("pkg-config").args(["--modversion", package]).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn check_pkg_config() -> bool {
    match Command::new("pkg-config").arg("--version").output() {
        Ok(output) if output.status.success() => true,
        _ => {
            println!("cargo:warning=pkg-config not found; system libraries cannot be located.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install pkg-config");
            println!("cargo:warning=On macOS: brew install pkg-config");
            false
        }
    }
}

fn check_opencv(has_pkg_config: bool) {
    for var in ["PKG_CONFIG_PATH", "OPENCV_LINK_PATHS", "OPENCV_INCLUDE_PATHS"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    // Explicit link paths bypass pkg-config discovery
    if env::var_os("OPENCV_LINK_PATHS").is_some() || !has_pkg_config {
        return;
    }

    match ["opencv4", "opencv"].into_iter().find_map(pkg_config_version) {
        Some(version) => println!("cargo:warning=Using OpenCV {version}"),
        None => {
            println!("cargo:warning=OpenCV not found via pkg-config; camera capture and the GUI need it.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev clang libclang-dev");
            println!("cargo:warning=On macOS: brew install opencv");
        }
    }
}

/// `ort` downloads a runtime by default; a system install needs a library location
fn check_onnxruntime(has_pkg_config: bool) {
    for var in ["ORT_STRATEGY", "ORT_LIB_LOCATION", "ORT_DYLIB_PATH"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    let strategy = env::var("ORT_STRATEGY").unwrap_or_else(|_| "download".to_string());
    if strategy != "system" {
        return;
    }

    match env::var("ORT_LIB_LOCATION") {
        Ok(location) if Path::new(&location).is_dir() => {
            println!("cargo:warning=Using ONNX Runtime from {location}");
        }
        Ok(location) => {
            println!("cargo:warning=ORT_LIB_LOCATION={location} is not a directory.");
        }
        Err(_) => {
            let version = if has_pkg_config {
                pkg_config_version("libonnxruntime")
            } else {
                None
            };
            match version {
                Some(version) => println!("cargo:warning=Found ONNX Runtime {version} via pkg-config"),
                None => {
                    println!("cargo:warning=ORT_STRATEGY=system but ORT_LIB_LOCATION is not set.");
                    println!("cargo:warning=Point it at the directory holding libonnxruntime, or unset ORT_STRATEGY to download a runtime.");
                }
            }
        }
    }
}

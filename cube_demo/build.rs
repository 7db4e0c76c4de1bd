// build.rs
// Compiles the demo's GLSL shaders to SPIR-V with glslc from the Vulkan SDK

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHADER_STAGES: [&str; 2] = ["vert", "frag"];

fn is_stale(source: &Path, output: &Path) -> bool {
    let modified = |path: &Path| std::fs::metadata(path).and_then(|meta| meta.modified()).ok();
    match (modified(source), modified(output)) {
        (Some(src), Some(dst)) => src > dst,
        _ => true,
    }
}

fn compile(glslc: &Path, source: &Path, output: &Path) {
    let status = Command::new(glslc)
        .arg("--target-env=vulkan1.1")
        .arg(source)
        .arg("-o")
        .arg(output)
        .status();

    match status {
        Ok(s) if s.success() => eprintln!("info: Compiled {} -> {}", source.display(), output.display()),
        Ok(s) => panic!("glslc failed for {} with exit code {}", source.display(), s.code().unwrap_or(-1)),
        Err(e) => panic!("Failed to run glslc for {}: {e}", source.display()),
    }
}

fn main() {
    println!("cargo:rerun-if-changed=resources/shaders");
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");
    println!("cargo:rerun-if-env-changed=SKIP_SHADERS");

    if env::var_os("SKIP_SHADERS").is_some() {
        eprintln!("info: Skipping shader compilation (SKIP_SHADERS set)");
        return;
    }

    let Some(vulkan_sdk) = env::var_os("VULKAN_SDK") else {
        eprintln!("warning: VULKAN_SDK not set, shader compilation skipped");
        return;
    };

    let glslc = if cfg!(target_os = "windows") {
        PathBuf::from(vulkan_sdk).join("Bin").join("glslc.exe")
    } else {
        PathBuf::from(vulkan_sdk).join("bin").join("glslc")
    };
    assert!(glslc.exists(), "glslc not found at {}", glslc.display());

    let manifest_dir = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR").unwrap_or_default());
    let shader_dir = manifest_dir.join("resources/shaders");
    // Workspace target dir, where ShaderConfig::with_path_resolution looks
    let target_dir = manifest_dir.join("../target/shaders");
    if let Err(e) = std::fs::create_dir_all(&target_dir) {
        eprintln!("warning: Failed to create {}: {e}", target_dir.display());
        return;
    }

    let Ok(entries) = std::fs::read_dir(&shader_dir) else {
        eprintln!("info: No shader directory found at {}", shader_dir.display());
        return;
    };

    let mut compiled = 0;
    for path in entries.filter_map(Result::ok).map(|entry| entry.path()) {
        let is_shader = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SHADER_STAGES.contains(&ext));
        let Some(name) = path.file_name() else { continue };
        if !is_shader {
            continue;
        }

        // cube.vert -> cube.vert.spv keeps stages with the same stem apart
        let mut output_name = name.to_os_string();
        output_name.push(".spv");
        let output = target_dir.join(output_name);

        if is_stale(&path, &output) {
            compile(&glslc, &path, &output);
            compiled += 1;
        }
    }

    eprintln!("info: {compiled} shader(s) compiled");
}

//! The release pipeline: the named build steps and their wiring.
//!
//! Tasks mirror the product's packaging flow: fetch external tools and
//! frameworks, build the docs, stamp real version numbers into the source
//! tree, run the external compilers/packagers, and assemble the
//! distributable archives. The `dist` task is the top of the graph.

use std::fs;
use std::path::Path;
use std::process::Command;

use crate::core::{RunContext, Task, TaskRegistry};
use crate::fetch::{self, ArchiveKind, ArchiveSource};
use crate::patch::{MarkedRegion, VersionStamp};
use crate::util::{copy_tree, run_tool, run_tool_capture};
use crate::{shiplog, Result};

/// Build the registry with every pipeline task.
pub fn registry() -> Result<TaskRegistry> {
    let mut reg = TaskRegistry::new();
    reg.register(
        Task::new("fetch_compiler", "Fetch the compiler used to compress builds.")
            .with_body(fetch_compiler),
    )?;
    reg.register(
        Task::new("install_frameworks", "Install the client framework checkouts.")
            .with_body(install_frameworks),
    )?;
    reg.register(
        Task::new("install_jquery", "Download the jquery snapshot plugin.")
            .with_body(install_jquery),
    )?;
    reg.register(
        Task::new(
            "setup",
            "Initial development setup: frameworks and snapshot plugins.",
        )
        .with_deps(&["install_jquery", "install_frameworks"]),
    )?;
    reg.register(Task::new("build_docs", "Build the documentation.").with_body(build_docs))?;
    reg.register(
        Task::new("jsdocs", "Generate API documentation with the jsdoc toolkit.")
            .with_body(jsdocs),
    )?;
    reg.register(Task::new("sdist", "Build the source distribution.").with_body(sdist))?;
    reg.register(
        Task::new("release_embed", "Build the embeddable client release.")
            .with_deps(&["build_docs", "fetch_compiler"])
            .with_body(release_embed),
    )?;
    reg.register(
        Task::new("dist", "Build the full server package for deployment.")
            .with_deps(&["build_docs", "fetch_compiler", "sdist", "release_embed"])
            .with_body(dist),
    )?;
    Ok(reg)
}

fn fetch_compiler(ctx: &RunContext) -> Result<()> {
    let cfg = &ctx.config.compiler;
    fetch::fetch(
        &ArchiveSource {
            name: "compiler".to_string(),
            url: cfg.url.clone(),
            dest: cfg.dest.clone(),
            cache: cfg.cache.clone(),
            kind: ArchiveKind::Zip,
        },
        ctx.force,
    )
}

fn install_frameworks(ctx: &RunContext) -> Result<()> {
    let cfg = &ctx.config.frameworks;
    let force = ctx.force || cfg.force;
    for repo in &cfg.repos {
        let source = if cfg.git {
            ArchiveSource {
                name: repo.clone(),
                url: format!("https://github.com/{}/{}.git", cfg.account, repo),
                dest: cfg.dest.join(repo),
                cache: cfg.dest.join(format!("{}.tgz", repo)),
                kind: ArchiveKind::Git { branch: None },
            }
        } else {
            ArchiveSource {
                name: repo.clone(),
                url: format!("https://github.com/{}/{}/tarball", cfg.account, repo),
                dest: cfg.dest.join(repo),
                cache: cfg.dest.join(format!("{}.tgz", repo)),
                kind: ArchiveKind::Tarball {
                    branch: "master".to_string(),
                },
            }
        };
        fetch::fetch(&source, force)?;
    }
    Ok(())
}

fn install_jquery(ctx: &RunContext) -> Result<()> {
    let cfg = &ctx.config.jquery;
    if cfg.dest.exists() {
        if !ctx.force {
            shiplog!("jquery already installed");
            return Ok(());
        }
        fs::remove_file(&cfg.dest)?;
    }

    shiplog!("downloading jquery from {}", cfg.url);
    let response = reqwest::blocking::get(&cfg.url)?;
    if !response.status().is_success() {
        return Err(crate::Error::Network(format!(
            "GET {} returned {}",
            cfg.url,
            response.status()
        )));
    }
    let body = response.text()?;

    // Wrap the library in the plugin envelope expected by the client loader
    let plugin = format!(
        "\n\"define metadata\";\n({{}});\n\"end\";\n\n{}\nexports.$ = $.noConflict(true);\n",
        body
    );
    if let Some(parent) = cfg.dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&cfg.dest, plugin)?;
    Ok(())
}

fn build_docs(ctx: &RunContext) -> Result<()> {
    let docsdir = ctx.config.builddir.join("docs");
    fs::create_dir_all(&docsdir)?;
    let mut cmd = Command::new("growl.py");
    cmd.arg(".").arg(format!("../{}", docsdir.display()));
    cmd.current_dir("docs");
    run_tool(cmd)
}

fn jsdocs(ctx: &RunContext) -> Result<()> {
    let cfg = &ctx.config.jsdocs;
    fetch::fetch(
        &ArchiveSource {
            name: "jsdoc-toolkit".to_string(),
            url: cfg.url.clone(),
            dest: cfg.dest.clone(),
            cache: cfg.cache.clone(),
            kind: ArchiveKind::Zip,
        },
        ctx.force,
    )?;

    let outputdir = ctx.config.builddir.join("docs").join("api");
    if outputdir.exists() {
        fs::remove_dir_all(&outputdir)?;
    }
    fs::create_dir_all(&outputdir)?;

    let toolkit = cfg.dest.canonicalize()?;
    let outputdir = outputdir.canonicalize()?;
    let sourcedir = fs::canonicalize("frameworks")?;

    let mut cmd = Command::new("java");
    cmd.arg("-jar")
        .arg("jsrun.jar")
        .arg("app/run.js")
        .arg("-a")
        .arg(format!("--directory={}", outputdir.display()))
        .arg("--encoding=utf-8")
        .arg("--recurse=10")
        .arg("--securemodules")
        .arg(format!("--template={}/templates/jsdoc", toolkit.display()))
        .arg("--verbose")
        .arg(sourcedir);
    cmd.current_dir(&toolkit);
    run_tool(cmd)
}

fn sdist(_ctx: &RunContext) -> Result<()> {
    let mut cmd = Command::new("python");
    cmd.arg("setup.py").arg("sdist");
    run_tool(cmd)
}

/// Build the embeddable client release: stamp the client version block, run
/// the compressor, assemble the drop-in tree, and produce the tarball.
fn release_embed(ctx: &RunContext) -> Result<()> {
    let cfg = ctx.config;
    let builddir = &cfg.builddir;
    fs::create_dir_all(builddir)?;

    let version = &cfg.version.number;
    let compiler_jar = cfg.compiler.dest.join("compiler.jar");
    let outputdir = builddir.join(format!("{}-embedded-{}", cfg.product, version));
    let region = MarkedRegion::javascript(&cfg.stamp.client_file)?;
    let values = VersionStamp::from(&cfg.version);

    region.stamped(&values, || {
        if outputdir.exists() {
            fs::remove_dir_all(&outputdir)?;
        }
        fs::create_dir_all(&outputdir)?;

        shiplog!("compiling prebuilt client");
        let builtdir = outputdir.join("prebuilt");
        let mut cmd = Command::new("dryice");
        cmd.arg(format!("-j{}", compiler_jar.display()))
            .arg(format!("-Doutput_dir=\"{}\"", builtdir.display()))
            .arg("dropin.json");
        let output = run_tool_capture(cmd)?;
        shiplog!("{}", output);

        fs::copy("LICENSE.txt", outputdir.join("LICENSE.txt"))?;
        fs::copy("embedded/README-Customizable.txt", outputdir.join("README.txt"))?;
        copy_tree(&builddir.join("docs"), &outputdir.join("docs"))?;
        Ok(())
    })?;

    // Ship the plugin sources and the compressor alongside the build
    copy_tree("plugins".as_ref(), &outputdir.join("plugins"))?;
    let compressors = outputdir.join("compressors");
    fs::create_dir_all(&compressors)?;
    fs::copy(&compiler_jar, compressors.join("compiler.jar"))?;

    let dirname = format!("{}-embedded-{}", cfg.product, version);
    let mut cmd = Command::new("tar");
    cmd.arg("czf")
        .arg(format!("{}.tar.gz", dirname))
        .arg(&dirname);
    cmd.current_dir(builddir);
    run_tool(cmd)
}

/// Build the server package with all the pieces for production deployment.
fn dist(ctx: &RunContext) -> Result<()> {
    let cfg = ctx.config;
    let builddir = &cfg.builddir;
    let version = &cfg.version.number;
    let output_dir = builddir.join(format!("{}-server", cfg.product));
    if output_dir.exists() {
        fs::remove_dir_all(&output_dir)?;
    }

    let values = VersionStamp::from(&cfg.version);

    // Stamp the server version block around the server packaging step
    let server_region = MarkedRegion::python(&cfg.stamp.server_file)?;
    server_region.stamped(&values, || {
        let mut cmd = Command::new("make");
        cmd.arg("production");
        cmd.current_dir(&cfg.server.directory);
        run_tool(cmd)
    })?;

    copy_tree(&cfg.server.directory.join("production"), &output_dir)?;
    let sdist_name = format!("{}-{}.tar.gz", cfg.product, version);
    fs::create_dir_all(output_dir.join("libs"))?;
    fs::copy(
        Path::new("dist").join(&sdist_name),
        output_dir.join("libs").join(&sdist_name),
    )?;

    // Stamp the client version block around the production client build
    let compiler_jar = cfg.compiler.dest.join("compiler.jar");
    let client_region = MarkedRegion::javascript(&cfg.stamp.client_file)?;
    client_region.stamped(&values, || {
        let mut cmd = Command::new("dryice");
        cmd.arg(format!("-j{}", compiler_jar.display()))
            .arg("production.json");
        let output = run_tool_capture(cmd)?;
        shiplog!("{}", output);
        Ok(())
    })?;

    let embedded = builddir.join(format!("{}-embedded-{}", cfg.product, version));
    copy_tree(&embedded, &output_dir.join("static").join("embedded"))?;
    copy_tree(&builddir.join("docs"), &output_dir.join("static").join("docs"))?;
    fs::copy("static/favicon.ico", output_dir.join("static").join("favicon.ico"))?;

    let dirname = format!("{}-server", cfg.product);
    let mut cmd = Command::new("tar");
    cmd.arg("czf")
        .arg(format!("{}.tar.gz", dirname))
        .arg(&dirname);
    cmd.current_dir(builddir);
    run_tool(cmd)
}

//! Integration tests for isolated loading: resolution sets, on-disk modules, cross-module
//! references and disposal.

mod common;

use std::{fs, sync::Arc};

use common::write_widget;
use dotdoc::prelude::*;
use tempfile::TempDir;

fn isolated(builder: MetadataUniverseBuilder) -> Result<(MetadataUniverse, MetadataProvider)> {
    let provider = MetadataProvider::new();
    let universe = builder.provider(provider.clone()).build()?;
    Ok((universe, provider))
}

/// One valid and one missing path: the missing one is dropped from the resolution set, but
/// loading it explicitly still reports it.
#[test]
fn missing_paths_are_filtered() -> Result<()> {
    let dir = TempDir::new()?;
    let valid = write_widget(dir.path(), "Valid.dll", "Valid")?;
    let missing = dir.path().join("Missing.dll");

    let (universe, provider) =
        isolated(MetadataUniverse::builder().paths([valid.clone(), missing.clone()]))?;
    assert_eq!(universe.candidates()?, [fs::canonicalize(&valid)?]);

    let loaded = universe.load_all()?;
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].assembly_name(), "Valid");
    assert!(provider.find_type_by_full_name("Valid.Widget").is_some());

    assert!(matches!(
        universe.load_from_path(&missing),
        Err(Error::NotFound(path)) if path == missing
    ));
    Ok(())
}

#[test]
fn loading_is_idempotent() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_widget(dir.path(), "App.dll", "App")?;
    let (universe, _provider) = isolated(MetadataUniverse::builder())?;

    let first = universe.load_from_path(&path)?;
    let second = universe.load_from_path(dir.path().join(".").join("App.dll"))?;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(universe.modules()?.len(), 1);
    assert_eq!(first.path(), Some(fs::canonicalize(&path)?.as_path()));
    Ok(())
}

#[test]
fn probing_recurses_and_filters_extensions() -> Result<()> {
    let dir = TempDir::new()?;
    let nested = dir.path().join("lib").join("net8.0");
    fs::create_dir_all(&nested)?;
    write_widget(dir.path(), "App.exe", "App")?;
    write_widget(&nested, "Lib.dll", "Lib")?;
    write_widget(&nested, "Lib.pdb", "Symbols")?;

    let (universe, _provider) = isolated(MetadataUniverse::builder().probe_directory(dir.path()))?;
    let mut names: Vec<String> = universe
        .load_all()?
        .iter()
        .map(|module| module.assembly_name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, ["App", "Lib"]);

    let (pdb_only, _provider) = isolated(
        MetadataUniverse::builder()
            .probe_directory(dir.path())
            .extensions(["pdb"]),
    )?;
    let candidates = pdb_only.candidates()?;
    assert_eq!(candidates.len(), 1);
    assert!(candidates[0].ends_with("Lib.pdb"));
    Ok(())
}

#[test]
fn undecodable_files_are_skipped() -> Result<()> {
    let dir = TempDir::new()?;
    write_widget(dir.path(), "Good.dll", "Good")?;
    let broken = dir.path().join("Broken.dll");
    fs::write(&broken, b"definitely not a module")?;

    let (universe, _provider) = isolated(MetadataUniverse::builder().probe_directory(dir.path()))?;
    assert_eq!(universe.candidates()?.len(), 2);
    let loaded = universe.load_all()?;
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].assembly_name(), "Good");

    let error = universe.load_from_path(&broken).unwrap_err();
    assert!(!matches!(error, Error::NotFound(_) | Error::Disposed));
    Ok(())
}

/// A reference into an assembly that is not loaded yet pulls it in from the resolution set.
#[test]
fn references_load_their_assemblies() -> Result<()> {
    let dir = TempDir::new()?;
    let mut library = ModuleBuilder::new("Library");
    TypeBuilder::class("Shapes", "Shape").build(&mut library)?;
    library.write_to(dir.path().join("Library.dll"))?;

    let mut app = ModuleBuilder::new("App");
    let shape = app.type_ref("Library", "Shapes", "Shape");
    TypeBuilder::class("App", "Circle")
        .extends(TypeSignature::Class(shape))
        .build(&mut app)?;
    let app_path = dir.path().join("App.dll");
    app.write_to(&app_path)?;

    let (universe, provider) = isolated(MetadataUniverse::builder().probe_directory(dir.path()))?;
    universe.load_from_path(&app_path)?;
    assert_eq!(universe.modules()?.len(), 1);

    let circle = provider.find_type_by_full_name("App.Circle").unwrap();
    let base = circle.base_type().unwrap();
    assert_eq!(base.full_name(), "Shapes.Shape");
    assert!(!base.is_unresolved());
    assert_eq!(base.module().unwrap().assembly_name(), "Library");
    assert_eq!(universe.modules()?.len(), 2);

    let direct = provider.find_type_by_full_name("Shapes.Shape").unwrap();
    assert_eq!(base, direct);
    assert_eq!(
        provider.resolve_member("T:Shapes.Shape"),
        Some(Member::Type(direct))
    );
    Ok(())
}

#[test]
fn invalid_arguments() -> Result<()> {
    let (universe, _provider) = isolated(MetadataUniverse::builder())?;
    assert!(matches!(
        universe.load_from_assembly_name(""),
        Err(Error::InvalidArgument(_))
    ));
    assert!(universe.load_from_assembly_name("Nowhere")?.is_none());
    assert!(matches!(
        universe.load_from_path(""),
        Err(Error::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn disposal() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_widget(dir.path(), "App.dll", "App")?;
    let (universe, provider) = isolated(MetadataUniverse::builder().path(&path))?;
    let other_handle = universe.clone();

    universe.load_all()?;
    let widget = Arc::downgrade(&provider.find_type_by_full_name("App.Widget").unwrap());
    assert!(widget.upgrade().is_some());

    universe.dispose();
    assert!(other_handle.is_disposed());
    other_handle.dispose();

    assert!(matches!(universe.load_from_path(&path), Err(Error::Disposed)));
    assert!(matches!(
        universe.load_from_path(dir.path().join("Gone.dll")),
        Err(Error::Disposed)
    ));
    assert!(matches!(universe.load_from_path(""), Err(Error::Disposed)));
    assert!(matches!(universe.load_from_assembly_name("App"), Err(Error::Disposed)));
    assert!(matches!(universe.load_all(), Err(Error::Disposed)));
    assert!(matches!(universe.candidates(), Err(Error::Disposed)));
    assert!(matches!(universe.modules(), Err(Error::Disposed)));

    assert!(widget.upgrade().is_none());
    assert!(provider.find_type_by_full_name("App.Widget").is_none());
    Ok(())
}

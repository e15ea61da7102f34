use anyhow::{bail, Result};
use flatexec::{Error, KernelArgs, Operator, OperatorRegistry};

fn noop(_args: &mut KernelArgs<'_, '_>) -> Result<()> {
    Ok(())
}

fn always_fails(_args: &mut KernelArgs<'_, '_>) -> Result<()> {
    bail!("not implemented")
}

#[test]
fn register_by_name() -> Result<()> {
    let mut registry = OperatorRegistry::new();
    assert!(registry.is_empty());
    registry.register("noop", noop)?;
    registry.register_operator(Operator::new("fails", always_fails))?;

    assert_eq!(registry.len(), 2);
    assert!(registry.has("noop"));
    assert!(registry.has("fails"));
    assert!(!registry.has("missing"));
    assert!(registry.get("noop").is_some());
    assert!(registry.get("missing").is_none());

    let op = registry.operator("fails").expect("registered");
    assert_eq!(op.name, "fails");
    assert!(op.overload.is_empty());
    Ok(())
}

#[test]
fn duplicate_registration_rejected() -> Result<()> {
    let mut registry = OperatorRegistry::new();
    registry.register("noop", noop)?;
    let err = registry.register("noop", always_fails).unwrap_err();
    assert!(matches!(err, Error::DuplicateOperator { ref name } if name == "noop"));

    // First registration wins.
    let mut values = Vec::new();
    let mut args = KernelArgs::new(&mut values, &[])?;
    let function = registry.get("noop").expect("registered");
    assert!(function(&mut args).is_ok());
    Ok(())
}

#[test]
fn builtins_are_registered() -> Result<()> {
    let registry = OperatorRegistry::with_builtins()?;
    for name in ["mul_out", "add_out", "sub_out"] {
        assert!(registry.has(name), "missing builtin {}", name);
    }
    let mut names: Vec<_> = registry.names().collect();
    names.sort_unstable();
    assert_eq!(names, vec!["add_out", "mul_out", "sub_out"]);
    Ok(())
}

#[test]
fn builtins_can_be_extended() -> Result<()> {
    let mut registry = OperatorRegistry::with_builtins()?;
    registry.register("noop", noop)?;
    assert!(registry.has("noop"));
    assert!(matches!(
        registry.register("add_out", noop),
        Err(Error::DuplicateOperator { .. })
    ));
    Ok(())
}

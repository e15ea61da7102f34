use anyhow::Result;
use flatexec::{EValue, Error, Scalar, ScalarType, Tag, Tensor};

use crate::common;

#[test]
fn tensor_reads_pool_bytes() -> Result<()> {
    let mut buffer = vec![0u8; 16];
    let memory = common::memory(&mut buffer)?;
    let value = common::int_tensor(&memory, 0, &[1, 2, 3, 4])?;
    let tensor = value.as_tensor()?;

    let view = tensor.elements::<i32>()?;
    assert_eq!(view.len(), 4);
    assert_eq!(view.get(0), 1);
    assert_eq!(view.get(3), 4);
    assert_eq!(view.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    Ok(())
}

#[test]
fn tensor_shape_and_nbytes() -> Result<()> {
    let mut buffer = vec![0u8; 16];
    let memory = common::memory(&mut buffer)?;
    let storage = memory.resolve(1, 0, 16)?;
    let tensor = Tensor::new(ScalarType::Int, vec![2, 2], storage)?;
    let value = EValue::from(tensor);

    assert!(value.is_tensor());
    let tensor = value.as_tensor()?;
    assert_eq!(tensor.nbytes(), 16);
    assert_eq!(tensor.dim(), 2);
    assert_eq!(tensor.size(0), Some(2));
    assert_eq!(tensor.size(2), None);
    assert_eq!(tensor.numel(), 4);
    Ok(())
}

#[test]
fn tensor_rejects_wrong_storage_length() -> Result<()> {
    let mut buffer = vec![0u8; 16];
    let memory = common::memory(&mut buffer)?;
    let storage = memory.resolve(1, 0, 12)?;
    let err = Tensor::new(ScalarType::Int, vec![2, 2], storage).unwrap_err();
    assert!(matches!(
        err,
        Error::ElementCount {
            expected: 16,
            actual: 12
        }
    ));
    Ok(())
}

#[test]
fn tensor_element_type_must_match_dtype() -> Result<()> {
    let mut buffer = vec![0u8; 16];
    let memory = common::memory(&mut buffer)?;
    let value = common::int_tensor(&memory, 0, &[1, 2, 3, 4])?;
    let tensor = value.as_tensor()?;

    assert!(matches!(
        tensor.elements::<f32>(),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        tensor.to_vec::<i64>(),
        Err(Error::TypeMismatch { .. })
    ));
    Ok(())
}

#[test]
fn tensor_writes_land_in_pool() -> Result<()> {
    let mut buffer = vec![0u8; 8];
    {
        let memory = common::memory(&mut buffer)?;
        let storage = memory.resolve(1, 0, 8)?;
        let tensor = Tensor::new(ScalarType::Short, vec![4], storage)?;
        let out = tensor.elements_mut::<i16>()?;
        out.fill(7);
        out.set(2, -1);
        assert_eq!(tensor.to_vec::<i16>()?, vec![7, 7, -1, 7]);
        assert!(matches!(
            tensor.copy_from_slice(&[1i16, 2, 3]),
            Err(Error::ElementCount {
                expected: 4,
                actual: 3
            })
        ));
    }
    assert_eq!(&buffer[4..6], &(-1i16).to_le_bytes());
    Ok(())
}

#[test]
fn scalar_tensor_has_one_element() -> Result<()> {
    let mut buffer = vec![0u8; 8];
    let memory = common::memory(&mut buffer)?;
    let storage = memory.resolve(1, 0, 8)?;
    let tensor = Tensor::new(ScalarType::Double, vec![], storage)?;
    assert_eq!(tensor.dim(), 0);
    assert_eq!(tensor.numel(), 1);
    tensor.copy_from_slice(&[2.5f64])?;
    assert_eq!(tensor.to_vec::<f64>()?, vec![2.5]);
    Ok(())
}

#[test]
fn evalue_from_scalar() -> Result<()> {
    let b = EValue::from(Scalar::Bool(true));
    assert!(b.is_scalar());
    assert!(b.is_bool());
    assert!(b.to_bool()?);

    let i = EValue::from(Scalar::Int(2));
    assert!(i.is_scalar());
    assert!(i.is_int());
    assert_eq!(i.to_int()?, 2);

    let d = EValue::from(Scalar::Double(3.0));
    assert!(d.is_scalar());
    assert!(d.is_double());
    assert!((d.to_double()? - 3.0).abs() < 0.01);
    Ok(())
}

#[test]
fn evalue_to_scalar() -> Result<()> {
    let v = EValue::from(2i64);
    assert!(v.is_scalar());
    let s = v.to_scalar()?;
    assert!(s.is_int());
    assert_eq!(s.to_int()?, 2);
    Ok(())
}

#[test]
fn wrong_accessor_is_type_mismatch() {
    let v = EValue::Int(5);
    assert_eq!(v.tag(), Tag::Int);
    assert!(matches!(
        v.as_tensor(),
        Err(Error::TypeMismatch {
            expected: "Tensor",
            actual: "Int"
        })
    ));
    assert!(matches!(v.to_double(), Err(Error::TypeMismatch { .. })));

    let none = EValue::default();
    assert!(none.is_none());
    assert!(!none.is_scalar());
    assert!(matches!(none.to_scalar(), Err(Error::TypeMismatch { .. })));

    let s = Scalar::Double(1.5);
    assert!(matches!(
        s.to_int(),
        Err(Error::TypeMismatch {
            expected: "Int",
            actual: "Double"
        })
    ));
}

#[test]
fn dtype_codes() -> Result<()> {
    assert_eq!(ScalarType::from_code(3)?, ScalarType::Int);
    assert_eq!(ScalarType::Int.code(), 3);
    assert_eq!(ScalarType::Long.element_size(), 8);
    assert_eq!(ScalarType::Bool.element_size(), 1);
    assert!(matches!(ScalarType::from_code(9), Err(Error::UnknownDType(9))));
    Ok(())
}

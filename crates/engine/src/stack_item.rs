//! Values on the evaluation stack.

use crate::error::VmError;
use meridian_types::{CodecError, Reader, Writer};
use num_bigint::BigInt;
use num_traits::{One, Zero};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Shared, mutable item list backing arrays and structs.
pub type ItemList = Rc<RefCell<Vec<StackItem>>>;

const TAG_BYTE_ARRAY: u8 = 0x00;
const TAG_BOOLEAN: u8 = 0x01;
const TAG_INTEGER: u8 = 0x02;
const TAG_ARRAY: u8 = 0x80;
const TAG_STRUCT: u8 = 0x81;

/// A VM value.
///
/// `Array` and `Struct` share their backing list between copies, so a
/// mutation through one handle is visible through every other. Structs are
/// deep-copied when stored into a container.
#[derive(Clone)]
pub enum StackItem {
    Boolean(bool),
    Integer(BigInt),
    ByteArray(Vec<u8>),
    Array(ItemList),
    Struct(ItemList),
    InteropInterface(Rc<dyn Any>),
}

impl StackItem {
    pub fn new_array(items: Vec<StackItem>) -> Self {
        Self::Array(Rc::new(RefCell::new(items)))
    }

    pub fn new_struct(items: Vec<StackItem>) -> Self {
        Self::Struct(Rc::new(RefCell::new(items)))
    }

    pub fn interop<T: Any>(value: T) -> Self {
        Self::InteropInterface(Rc::new(value))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "Boolean",
            Self::Integer(_) => "Integer",
            Self::ByteArray(_) => "ByteArray",
            Self::Array(_) => "Array",
            Self::Struct(_) => "Struct",
            Self::InteropInterface(_) => "InteropInterface",
        }
    }

    pub fn to_bool(&self) -> bool {
        match self {
            Self::Boolean(b) => *b,
            Self::Integer(i) => !i.is_zero(),
            Self::ByteArray(bytes) => bytes.iter().any(|b| *b != 0),
            Self::Array(_) | Self::Struct(_) | Self::InteropInterface(_) => true,
        }
    }

    pub fn to_bigint(&self) -> Result<BigInt, VmError> {
        match self {
            Self::Boolean(true) => Ok(BigInt::one()),
            Self::Boolean(false) => Ok(BigInt::zero()),
            Self::Integer(i) => Ok(i.clone()),
            Self::ByteArray(bytes) => Ok(bigint_from_bytes(bytes)),
            other => Err(VmError::TypeMismatch {
                expected: "integer",
                found: other.type_name(),
            }),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, VmError> {
        match self {
            Self::Boolean(true) => Ok(vec![1]),
            Self::Boolean(false) => Ok(Vec::new()),
            Self::Integer(i) => Ok(bigint_to_bytes(i)),
            Self::ByteArray(bytes) => Ok(bytes.clone()),
            other => Err(VmError::TypeMismatch {
                expected: "byte array",
                found: other.type_name(),
            }),
        }
    }

    /// Backing list of an array or struct.
    pub fn as_list(&self) -> Result<&ItemList, VmError> {
        match self {
            Self::Array(list) | Self::Struct(list) => Ok(list),
            other => Err(VmError::TypeMismatch {
                expected: "array",
                found: other.type_name(),
            }),
        }
    }

    pub fn as_interop<T: Any>(&self) -> Option<&T> {
        match self {
            Self::InteropInterface(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Copy used when a value is stored into a container: structs get a
    /// fresh backing list, everything else is shared.
    pub fn copy_for_storage(&self) -> Self {
        match self {
            Self::Struct(list) => {
                let items = list.borrow().iter().map(Self::copy_for_storage).collect();
                Self::new_struct(items)
            }
            other => other.clone(),
        }
    }

    /// `EQUAL` semantics: arrays and interop objects compare by identity,
    /// structs element-wise, scalars by their byte representation.
    pub fn equals(&self, other: &StackItem) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Struct(a), Self::Struct(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Self::InteropInterface(a), Self::InteropInterface(b)) => Rc::ptr_eq(a, b),
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            _ => match (self.to_bytes(), other.to_bytes()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Tagged binary encoding. Interop objects and cyclic containers cannot
    /// be serialized.
    pub fn serialize(&self) -> Result<Vec<u8>, VmError> {
        let mut w = Writer::new();
        let mut visiting = HashSet::new();
        self.serialize_into(&mut w, &mut visiting)?;
        Ok(w.into_bytes())
    }

    fn serialize_into(
        &self,
        w: &mut Writer,
        visiting: &mut HashSet<*const RefCell<Vec<StackItem>>>,
    ) -> Result<(), VmError> {
        match self {
            Self::ByteArray(bytes) => {
                w.write_u8(TAG_BYTE_ARRAY);
                w.write_var_bytes(bytes);
            }
            Self::Boolean(b) => {
                w.write_u8(TAG_BOOLEAN);
                w.write_bool(*b);
            }
            Self::Integer(i) => {
                w.write_u8(TAG_INTEGER);
                w.write_var_bytes(&bigint_to_bytes(i));
            }
            Self::Array(list) | Self::Struct(list) => {
                let ptr = Rc::as_ptr(list);
                if !visiting.insert(ptr) {
                    return Err(VmError::NotSerializable("cyclic container"));
                }
                w.write_u8(if matches!(self, Self::Array(_)) {
                    TAG_ARRAY
                } else {
                    TAG_STRUCT
                });
                let items = list.borrow();
                w.write_var_uint(items.len() as u64);
                for item in items.iter() {
                    item.serialize_into(w, visiting)?;
                }
                visiting.remove(&ptr);
            }
            Self::InteropInterface(_) => {
                return Err(VmError::NotSerializable("interop interface"));
            }
        }
        Ok(())
    }

    /// Inverse of [`StackItem::serialize`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes);
        let item = Self::deserialize_from(&mut r)?;
        r.finish()?;
        Ok(item)
    }

    fn deserialize_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        match r.read_u8()? {
            TAG_BYTE_ARRAY => Ok(Self::ByteArray(r.read_var_bytes()?)),
            TAG_BOOLEAN => Ok(Self::Boolean(r.read_bool()?)),
            TAG_INTEGER => Ok(Self::Integer(bigint_from_bytes(&r.read_var_bytes()?))),
            tag @ (TAG_ARRAY | TAG_STRUCT) => {
                let items = r.read_list(Self::deserialize_from)?;
                Ok(if tag == TAG_ARRAY {
                    Self::new_array(items)
                } else {
                    Self::new_struct(items)
                })
            }
            value => Err(CodecError::InvalidEnumValue {
                what: "stack item tag",
                value,
            }),
        }
    }
}

impl From<bool> for StackItem {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<BigInt> for StackItem {
    fn from(value: BigInt) -> Self {
        Self::Integer(value)
    }
}

impl From<i64> for StackItem {
    fn from(value: i64) -> Self {
        Self::Integer(BigInt::from(value))
    }
}

impl From<Vec<u8>> for StackItem {
    fn from(value: Vec<u8>) -> Self {
        Self::ByteArray(value)
    }
}

impl From<&[u8]> for StackItem {
    fn from(value: &[u8]) -> Self {
        Self::ByteArray(value.to_vec())
    }
}

impl fmt::Debug for StackItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "Boolean({b})"),
            Self::Integer(i) => write!(f, "Integer({i})"),
            Self::ByteArray(bytes) => {
                write!(f, "ByteArray(")?;
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                write!(f, ")")
            }
            // Length only: containers may be cyclic
            Self::Array(list) => write!(f, "Array(len={})", list.borrow().len()),
            Self::Struct(list) => write!(f, "Struct(len={})", list.borrow().len()),
            Self::InteropInterface(_) => write!(f, "InteropInterface"),
        }
    }
}

/// Little-endian two's complement, empty for zero.
pub fn bigint_to_bytes(value: &BigInt) -> Vec<u8> {
    if value.is_zero() {
        return Vec::new();
    }
    value.to_signed_bytes_le()
}

pub fn bigint_from_bytes(bytes: &[u8]) -> BigInt {
    if bytes.is_empty() {
        return BigInt::zero();
    }
    BigInt::from_signed_bytes_le(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_byte_encoding() {
        assert_eq!(bigint_to_bytes(&BigInt::from(0)), Vec::<u8>::new());
        assert_eq!(bigint_to_bytes(&BigInt::from(-1)), vec![0xFF]);
        assert_eq!(bigint_to_bytes(&BigInt::from(128)), vec![0x80, 0x00]);
        assert_eq!(bigint_from_bytes(&[0x80, 0x00]), BigInt::from(128));
        assert_eq!(bigint_from_bytes(&[0x80]), BigInt::from(-128));
    }

    #[test]
    fn test_to_bool() {
        assert!(!StackItem::ByteArray(vec![0, 0]).to_bool());
        assert!(StackItem::ByteArray(vec![0, 1]).to_bool());
        assert!(!StackItem::from(0i64).to_bool());
        assert!(StackItem::new_array(Vec::new()).to_bool());
    }

    #[test]
    fn test_array_shares_backing_list() {
        let a = StackItem::new_array(vec![StackItem::from(1i64)]);
        let b = a.clone();
        b.as_list().unwrap().borrow_mut().push(StackItem::from(2i64));
        assert_eq!(a.as_list().unwrap().borrow().len(), 2);
        assert!(a.equals(&b));
        assert!(!a.equals(&StackItem::new_array(Vec::new())));
    }

    #[test]
    fn test_struct_copy_is_deep() {
        let s = StackItem::new_struct(vec![StackItem::from(1i64)]);
        let copy = s.copy_for_storage();
        copy.as_list().unwrap().borrow_mut().push(StackItem::from(2i64));
        assert_eq!(s.as_list().unwrap().borrow().len(), 1);
        assert!(!s.equals(&copy));
    }

    #[test]
    fn test_equal_across_types() {
        assert!(StackItem::Boolean(true).equals(&StackItem::ByteArray(vec![1])));
        assert!(StackItem::from(5i64).equals(&StackItem::ByteArray(vec![5])));
    }

    #[test]
    fn test_serialize_roundtrip_nested() {
        let inner = StackItem::new_struct(vec![StackItem::Boolean(true)]);
        let item = StackItem::new_array(vec![
            StackItem::from(-7i64),
            StackItem::ByteArray(b"abc".to_vec()),
            inner,
        ]);
        let bytes = item.serialize().unwrap();
        let back = StackItem::deserialize(&bytes).unwrap();
        assert_eq!(back.serialize().unwrap(), bytes);
    }

    #[test]
    fn test_cyclic_array_not_serializable() {
        let a = StackItem::new_array(Vec::new());
        a.as_list().unwrap().borrow_mut().push(a.clone());
        assert!(matches!(a.serialize(), Err(VmError::NotSerializable(_))));
        // Break the cycle so the Rc is freed.
        a.as_list().unwrap().borrow_mut().clear();
    }
}

use crate::error::Error;
use crate::inject::{AnyModification, InjectableByte, InjectableBytes, InjectableInteger};

/// Mutable, type-erased view on one named field of a message. Used by drivers which only know
/// the field by name, e.g. when the injection comes from a configuration file.
#[derive(Debug)]
pub enum FieldMut<'a> {
    Byte(&'a mut InjectableByte),
    Integer(&'a mut InjectableInteger),
    Bytes(&'a mut InjectableBytes),
}

impl<'a> FieldMut<'a> {
    pub fn family(&self) -> &'static str {
        match self {
            FieldMut::Byte(_) => "byte",
            FieldMut::Integer(_) => "integer",
            FieldMut::Bytes(_) => "bytes",
        }
    }

    /// Append `modification` to the chain of the field
    pub fn push(&mut self, modification: AnyModification) -> Result<(), Error> {
        match (self, modification) {
            (FieldMut::Byte(field), AnyModification::Byte(m)) => field.push(m),
            (FieldMut::Integer(field), AnyModification::Integer(m)) => field.push(m),
            (FieldMut::Bytes(field), AnyModification::Bytes(m)) => field.push(m),
            (field, m) => return Err(Self::mismatch(field.family(), &m)),
        }
        Ok(())
    }

    pub fn set_post(&mut self, modification: AnyModification) -> Result<(), Error> {
        match (self, modification) {
            (FieldMut::Byte(field), AnyModification::Byte(m)) => field.set_post(Some(m)),
            (FieldMut::Integer(field), AnyModification::Integer(m)) => field.set_post(Some(m)),
            (FieldMut::Bytes(field), AnyModification::Bytes(m)) => field.set_post(Some(m)),
            (field, m) => return Err(Self::mismatch(field.family(), &m)),
        }
        Ok(())
    }

    pub fn detach(&mut self) {
        match self {
            FieldMut::Byte(field) => field.detach(),
            FieldMut::Integer(field) => field.detach(),
            FieldMut::Bytes(field) => field.detach(),
        }
    }

    fn mismatch(family: &str, modification: &AnyModification) -> Error {
        Error::ConfigurationMismatch(format!(
            "cannot attach a {} modification ({}) to a {} field",
            modification.family(),
            modification,
            family
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::{BytesModification, IntegerModification};

    #[test_log::test]
    fn push_checks_family() {
        let mut length = InjectableInteger::with_original(4);
        let mut field = FieldMut::Integer(&mut length);
        field
            .push(AnyModification::Integer(IntegerModification::Add(1)))
            .unwrap();
        let err = field
            .push(AnyModification::Bytes(BytesModification::Duplicate))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationMismatch(_)));
        assert_eq!(length.value(), 5);
    }
}

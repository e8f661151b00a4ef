//! Mutable evaluation slots shared between callables and their callers.
//!
//! A register is the one mutable cell in the evaluator: state variables get
//! a current-state and a next-state register each, lambda parameters get one
//! per formal, and the simulator keeps shadow registers for bookkeeping like
//! the last trace. Both the callable and the code that fills its slots hold
//! `Rc` handles to the same cell.

use std::{cell::RefCell, rc::Rc};

use crate::{
    errors::{EvalResult, RuntimeError, RuntimeErrorKind},
    ir::NodeId,
    value::Value,
};

/// What a register models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
pub enum RegisterKind {
    /// Current-state slot of a state variable.
    #[strum(serialize = "var")]
    Var,
    /// Next-state shadow slot of a state variable.
    #[strum(serialize = "nextvar")]
    NextVar,
    /// Lambda parameter slot.
    #[strum(serialize = "arg")]
    Arg,
    /// Simulator bookkeeping slot.
    #[strum(serialize = "shadow")]
    Shadow,
}

/// A named slot holding an optional value.
///
/// Reading an unset register is a runtime error attributed to the
/// declaration site, which is what turns "variable not assigned in this
/// step" into a diagnosable failure instead of a crash.
#[derive(Debug)]
pub struct Register {
    pub name: Rc<str>,
    pub kind: RegisterKind,
    /// Declaration-site identity for unset-read diagnostics.
    pub decl_id: NodeId,
    value: RefCell<Option<Value>>,
}

/// Shared handle to a register.
pub type RegisterRef = Rc<Register>;

impl Register {
    pub fn new(name: impl AsRef<str>, kind: RegisterKind, decl_id: NodeId) -> RegisterRef {
        Rc::new(Self {
            name: Rc::from(name.as_ref()),
            kind,
            decl_id,
            value: RefCell::new(None),
        })
    }

    /// Reads the current value, failing when the slot is unset.
    pub fn read(&self) -> EvalResult<Value> {
        self.value.borrow().clone().ok_or_else(|| {
            RuntimeError::new(
                RuntimeErrorKind::UnsetRegister,
                format!("{} {} is not set", self.kind, self.name),
            )
            .with_ref(self.decl_id)
        })
    }

    pub fn write(&self, value: Value) {
        *self.value.borrow_mut() = Some(value);
    }

    pub fn clear(&self) {
        *self.value.borrow_mut() = None;
    }

    #[must_use]
    pub fn peek(&self) -> Option<Value> {
        self.value.borrow().clone()
    }

    pub fn restore(&self, value: Option<Value>) {
        *self.value.borrow_mut() = value;
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.value.borrow().is_some()
    }
}

/// Copies the value column of a register bank.
///
/// The copy is independent: values are persistent, so sharing their spines
/// with the live registers cannot leak later mutation into the snapshot.
#[must_use]
pub fn snapshot(registers: &[RegisterRef]) -> Vec<Option<Value>> {
    registers.iter().map(|register| register.peek()).collect()
}

/// Writes a snapshot back into a register bank.
///
/// # Panics
/// Panics if the snapshot was taken from a bank of a different size.
pub fn recover(registers: &[RegisterRef], saved: &[Option<Value>]) {
    assert_eq!(registers.len(), saved.len(), "snapshot does not match register bank");
    for (register, value) in registers.iter().zip(saved) {
        register.restore(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_read_is_attributed_to_the_declaration() {
        let register = Register::new("n", RegisterKind::Var, 42);
        let error = register.read().unwrap_err();
        assert_eq!(error.kind, RuntimeErrorKind::UnsetRegister);
        assert_eq!(error.references.as_slice(), &[42]);
    }

    #[test]
    fn snapshot_recover_round_trips() {
        let bank = vec![
            Register::new("a", RegisterKind::Var, 1),
            Register::new("b", RegisterKind::NextVar, 2),
        ];
        bank[0].write(Value::int(7));

        let saved = snapshot(&bank);
        bank[0].write(Value::int(99));
        bank[1].write(Value::Bool(true));

        recover(&bank, &saved);
        assert_eq!(bank[0].read().unwrap(), Value::int(7));
        assert!(!bank[1].is_set());
    }
}

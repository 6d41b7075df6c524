use core::fmt::Display;

use serde::{Deserialize, Serialize};
use tilepipe_common::Element;
use tilepipe_core::GlobalTensor;

use crate::matmul::MatmulSetupError;

/// Operand or result of a matmul.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatmulIdent {
    /// Left operand, `m x k`.
    Lhs,
    /// Right operand, `k x n`.
    Rhs,
    /// Result, `m x n`.
    Out,
}

impl Display for MatmulIdent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            MatmulIdent::Lhs => "lhs",
            MatmulIdent::Rhs => "rhs",
            MatmulIdent::Out => "out",
        };
        f.write_str(name)
    }
}

/// Description of a matmul problem to solve, regardless of actual data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, new, Serialize, Deserialize)]
pub struct MatmulProblem {
    /// Rows of the result.
    pub m: usize,
    /// Columns of the result.
    pub n: usize,
    /// Contraction dimension.
    pub k: usize,
}

impl MatmulProblem {
    /// Infer the problem from the operands, checking the output agrees.
    pub fn from_tensors<EI: Element, EO: Element>(
        lhs: &GlobalTensor<EI>,
        rhs: &GlobalTensor<EI>,
        out: &GlobalTensor<EO>,
    ) -> Result<Self, MatmulSetupError> {
        let (m, k) = lhs.shape();
        let problem = Self::new(m, rhs.cols(), k);

        problem.check(MatmulIdent::Rhs, rhs.shape())?;
        problem.check(MatmulIdent::Out, out.shape())?;

        Ok(problem)
    }

    /// Shape of the identified matrix.
    pub fn shape(&self, ident: MatmulIdent) -> (usize, usize) {
        match ident {
            MatmulIdent::Lhs => (self.m, self.k),
            MatmulIdent::Rhs => (self.k, self.n),
            MatmulIdent::Out => (self.m, self.n),
        }
    }

    /// Floating point operations of the problem, a multiply-add counting as two.
    pub fn flops(&self) -> usize {
        2 * self.m * self.n * self.k
    }

    fn check(&self, ident: MatmulIdent, actual: (usize, usize)) -> Result<(), MatmulSetupError> {
        let expected = self.shape(ident);
        if expected != actual {
            return Err(MatmulSetupError::ShapeMismatch {
                ident,
                expected,
                actual,
            });
        }
        Ok(())
    }
}

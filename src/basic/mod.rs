pub mod iterative_refiner;
pub mod linear_solver;
pub mod solver;
pub mod sparse;

#[cfg(test)]
pub(crate) mod testing;

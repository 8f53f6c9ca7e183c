/// A source of initial topic model weights.
pub trait ParamGen {
    /// Overwrites `row` with the next weights of the generator.
    ///
    /// # Returns
    /// Whether the generator had enough weights left to fill the whole row,
    /// `row` is left untouched otherwise.
    fn fill_row(&mut self, row: &mut [f32]) -> bool;
}

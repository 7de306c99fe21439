use crate::error::ReductionError;
use crate::pipeline::{reduce, Reduction, ReductionParams};
use ccc_instrument::{InstrumentRecord, RawAcquisition};
use tracing::debug;

/// An interactive reduction of one measurement. Holds the last successful
/// pass; a pass that fails leaves both the results and the parameters as
/// they were.
pub struct Session {
    acquisition: RawAcquisition,
    instrument: InstrumentRecord,
    params: ReductionParams,
    current: Option<Reduction>,
}

impl Session {
    pub fn new(
        acquisition: RawAcquisition,
        instrument: InstrumentRecord,
        params: ReductionParams,
    ) -> Self {
        Self {
            acquisition,
            instrument,
            params,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Reduction> {
        self.current.as_ref()
    }

    pub fn params(&self) -> &ReductionParams {
        &self.params
    }

    /// Cycle indices deleted by the user, most recent last.
    pub fn deleted(&self) -> &[usize] {
        &self.params.deleted
    }

    /// Reruns the reduction with the current parameters.
    pub fn run(&mut self) -> Result<&Reduction, ReductionError> {
        let params = self.params.clone();
        self.apply(params)
    }

    pub fn update_params(&mut self, params: ReductionParams) -> Result<&Reduction, ReductionError> {
        self.apply(params)
    }

    /// Deletes the BVD record at `position` in the current series.
    pub fn delete(&mut self, position: usize) -> Result<&Reduction, ReductionError> {
        let index = self
            .current
            .as_ref()
            .and_then(|r| r.bvd.get(position))
            .map(|r| r.index)
            .ok_or(ReductionError::UnknownPosition(position))?;

        debug!("deleting cycle {index}");
        let mut params = self.params.clone();
        params.deleted.push(index);
        self.apply(params)
    }

    /// Restores the most recently deleted record.
    pub fn restore(&mut self) -> Result<&Reduction, ReductionError> {
        let mut params = self.params.clone();
        let index = params
            .deleted
            .pop()
            .ok_or(ReductionError::NothingToRestore)?;

        debug!("restoring cycle {index}");
        self.apply(params)
    }

    fn apply(&mut self, params: ReductionParams) -> Result<&Reduction, ReductionError> {
        let reduction = reduce(&self.acquisition, &self.instrument, &params)?;
        self.params = params;
        Ok(self.current.insert(reduction))
    }
}

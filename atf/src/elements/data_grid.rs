use crate::errors::AutomationError;
use tracing::debug;

const ROW_COUNT_PROPERTY: &str = "Grid.RowCount";

typed_element!(DataGridElement => DATA_GRID);

typed_element!(DataGridRowElement => DATA_GRID_ROW);

typed_element!(DataGridCellElement => DATA_GRID_CELL);

impl DataGridElement {
    pub fn row_count(&self) -> Result<usize, AutomationError> {
        self.navigation().awaiting().wait_for_default_action_delay();
        let value = self.property(ROW_COUNT_PROPERTY)?;
        value.trim().parse().map_err(|_| {
            AutomationError::PlatformError(format!("{ROW_COUNT_PROPERTY} is not a number: {value:?}"))
        })
    }

    /// Rows of the grid; skips the search for an empty grid.
    pub fn rows(&self) -> Result<Vec<DataGridRowElement>, AutomationError> {
        debug!("get rows");
        if self.row_count()? == 0 {
            return Ok(Vec::new());
        }
        self.find_all_elements(&[])
    }
}

impl DataGridRowElement {
    pub fn cells(&self) -> Result<Vec<DataGridCellElement>, AutomationError> {
        debug!("get cells");
        self.find_all_elements(&[])
    }
}

//! Exception blocks.
//!
//! A region starts with its protected body open. Handlers begin and end one
//! at a time, and only on the innermost open region. Every boundary needs an
//! empty stack; a catch body starts with the caught exception pushed.

use tracing::debug;
use verasm_types::SemanticType;

use super::Emitter;
use crate::error::{ArgumentError, EmitResult, HandlerKind, InvalidOperationError, VerifyError};
use crate::instruction::Instruction;
use crate::state::{
    BlockEntry, Body, Catch, Finally, HandlerRecord, HandlerSort, Region, RegionRecord,
    describe_region,
};

impl Emitter {
    fn require_empty_stack(&self, operation: &'static str) -> Result<(), VerifyError> {
        let depth = self.state.stack.len();
        if depth == 0 {
            Ok(())
        } else {
            Err(VerifyError::StackNotEmpty { operation, depth })
        }
    }

    /// Fails unless `region` is open and is the innermost open region.
    fn require_innermost(&self, region: u32, operation: &'static str, verb: &'static str) -> EmitResult<()> {
        if self.state.regions[region as usize].is_closed() {
            return Err(InvalidOperationError::RegionClosed {
                operation,
                region: describe_region(region),
            }
            .into());
        }
        match self.state.innermost_region() {
            Some(innermost) if innermost != region => Err(InvalidOperationError::InnerRegionOpen {
                operation: verb,
                region: describe_region(region),
                inner: describe_region(innermost),
            }
            .into()),
            _ => Ok(()),
        }
    }

    fn require_no_open_handler(&self, region: u32, requested: HandlerKind) -> EmitResult<()> {
        match self.state.regions[region as usize].open_handler {
            Some(open) => Err(InvalidOperationError::HandlerAlreadyOpen {
                requested,
                region: describe_region(region),
                open: self.state.handlers[open as usize].sort.kind(),
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Opens a protected region. The stack must be empty.
    pub fn begin_exception_block(&mut self) -> EmitResult<Region> {
        self.require_empty_stack("BeginExceptionBlock")?;
        let index = self.state.regions.len();
        let parent = self.state.innermost_region();
        self.state
            .regions
            .push(RegionRecord::new(self.instructions.len(), parent));
        self.state.blocks.push(BlockEntry {
            region: index as u32,
            body: Body::Try,
        });
        let region = Region::new(self.state.owner(), index);
        debug!(region = %region, ?parent, "Began exception block");
        self.record(Instruction::BeginExceptionBlock(region));
        Ok(region)
    }

    /// Begins a catch body for exceptions deriving from `exception`.
    pub fn begin_catch_block(&mut self, region: Region, exception: SemanticType) -> EmitResult<Catch> {
        self.begin_catch(region, Some(exception))
    }

    /// Begins a catch body for any exception.
    pub fn begin_catch_all_block(&mut self, region: Region) -> EmitResult<Catch> {
        self.begin_catch(region, None)
    }

    fn begin_catch(&mut self, handle: Region, exception: Option<SemanticType>) -> EmitResult<Catch> {
        let region = self.state.region(handle)?;
        self.require_innermost(region, "BeginCatchBlock", "CatchBlock")?;
        self.require_no_open_handler(region, HandlerKind::Catch)?;
        if let Some(ty) = &exception {
            let is_exception = ty.class().is_some_and(|class| class.is_exception());
            if !is_exception {
                return Err(ArgumentError::NotAnException {
                    parameter: "exceptionType",
                    found: ty.clone(),
                }
                .into());
            }
        }
        self.require_empty_stack("BeginCatchBlock")?;

        let caught = exception.clone().unwrap_or_else(SemanticType::exception);
        let sort = match &exception {
            Some(ty) => HandlerSort::Catch(ty.clone()),
            None => HandlerSort::CatchAll,
        };
        let handler = self.open_handler(region, sort);
        self.state.stack.replace("BeginCatchBlock", &[caught])?;
        let catch = Catch::new(self.state.owner(), handler as usize);
        debug!(region = %handle, catch = %catch, "Began catch block");
        self.record(Instruction::BeginCatch {
            region: handle,
            catch,
            exception,
        });
        Ok(catch)
    }

    /// Ends the open catch body. Control leaves it implicitly, so the stack
    /// must be empty.
    pub fn end_catch_block(&mut self, handle: Catch) -> EmitResult<()> {
        let handler = self.state.catch(handle)?;
        self.close_handler(handler, "EndCatchBlock")?;
        self.record(Instruction::EndCatch(handle));
        Ok(())
    }

    /// Begins the finally body. A region has at most one.
    pub fn begin_finally_block(&mut self, handle: Region) -> EmitResult<Finally> {
        let region = self.state.region(handle)?;
        self.require_innermost(region, "BeginFinallyBlock", "FinallyBlock")?;
        self.require_no_open_handler(region, HandlerKind::Finally)?;
        if self.state.regions[region as usize].has_finally(&self.state.handlers) {
            return Err(InvalidOperationError::DuplicateFinally {
                region: describe_region(region),
            }
            .into());
        }
        self.require_empty_stack("BeginFinallyBlock")?;

        let handler = self.open_handler(region, HandlerSort::Finally);
        let finally = Finally::new(self.state.owner(), handler as usize);
        debug!(region = %handle, finally = %finally, "Began finally block");
        self.record(Instruction::BeginFinally {
            region: handle,
            finally,
        });
        Ok(finally)
    }

    pub fn end_finally_block(&mut self, handle: Finally) -> EmitResult<()> {
        let handler = self.state.finally(handle)?;
        self.close_handler(handler, "EndFinallyBlock")?;
        self.record(Instruction::EndFinally(handle));
        Ok(())
    }

    /// Closes the region. Its handlers must all be closed and there must be
    /// at least one.
    pub fn end_exception_block(&mut self, handle: Region) -> EmitResult<()> {
        let region = self.state.region(handle)?;
        self.require_innermost(region, "EndExceptionBlock", "EndExceptionBlock")?;
        let record = &self.state.regions[region as usize];
        if let Some(open) = record.open_handler {
            return Err(InvalidOperationError::RegionHasOpenHandler {
                region: describe_region(region),
                open: self.state.handlers[open as usize].sort.kind(),
            }
            .into());
        }
        if record.handlers.is_empty() {
            return Err(InvalidOperationError::RegionWithoutHandlers {
                region: describe_region(region),
            }
            .into());
        }
        self.require_empty_stack("EndExceptionBlock")?;

        self.state.regions[region as usize].end = Some(self.instructions.len());
        self.state.blocks.pop();
        // Every handler exits to the end of the region.
        self.state.stack.clear();
        self.state.reachable = true;
        debug!(region = %handle, "Ended exception block");
        self.record(Instruction::EndExceptionBlock(handle));
        Ok(())
    }

    fn open_handler(&mut self, region: u32, sort: HandlerSort) -> u32 {
        let handler = self.state.handlers.len() as u32;
        self.state.handlers.push(HandlerRecord {
            region,
            sort,
            start: self.instructions.len(),
            end: None,
        });
        let record = &mut self.state.regions[region as usize];
        record.handlers.push(handler);
        record.open_handler = Some(handler);
        self.state.set_body(region, Body::Handler(handler));
        self.state.stack.clear();
        self.state.reachable = true;
        handler
    }

    fn close_handler(&mut self, handler: u32, operation: &'static str) -> EmitResult<()> {
        let record = &self.state.handlers[handler as usize];
        let region = record.region;
        if self.state.regions[region as usize].open_handler != Some(handler) {
            return Err(InvalidOperationError::HandlerNotOpen {
                handler: record.describe(handler as usize),
            }
            .into());
        }
        if let Some(innermost) = self.state.innermost_region().filter(|&inner| inner != region) {
            return Err(InvalidOperationError::InnerRegionOpen {
                operation,
                region: describe_region(region),
                inner: describe_region(innermost),
            }
            .into());
        }
        self.require_empty_stack(operation)?;

        self.state.handlers[handler as usize].end = Some(self.instructions.len());
        self.state.regions[region as usize].open_handler = None;
        self.state.set_body(region, Body::Between);
        self.state.terminate();
        debug!(
            handler,
            region,
            phase = %self.state.regions[region as usize].phase(&self.state.handlers),
            "Ended handler"
        );
        Ok(())
    }
}

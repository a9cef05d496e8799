use std::io::BufRead;

use rv32i::StepTrigger;

/// Releases one step per line read from `input`; end of input stops the run.
pub struct LineTrigger<R> {
    input: R,
    line: Vec<u8>,
}

impl<R: BufRead> LineTrigger<R> {
    pub fn new(input: R) -> Self {
        LineTrigger {
            input,
            line: Vec::new(),
        }
    }
}

impl<R: BufRead> StepTrigger for LineTrigger<R> {
    fn wait(&mut self) -> bool {
        self.line.clear();
        match self.input.read_until(b'\n', &mut self.line) {
            Ok(0) => false,
            Ok(_) => true,
            Err(err) => {
                tracing::error!("failed to read step trigger: {}", err);
                false
            }
        }
    }
}

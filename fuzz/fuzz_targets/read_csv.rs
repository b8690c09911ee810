#![no_main]

use isotherm_fit::Dataset;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|bytes: &[u8]| {
    let Ok(data) = Dataset::from_reader(bytes) else {
        return;
    };
    let _ = data.unary(None);
    if let [i, j, ..] = data.species().as_slice() {
        let _ = data.binary(i, j);
    }
});

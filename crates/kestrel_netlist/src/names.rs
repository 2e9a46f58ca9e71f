//! Helpers for the hierarchical naming scheme `scope^port~bit`.
//!
//! Elaborated names carry their scope before the first `^` and a bit index
//! after `~`, e.g. `top^count~3` is bit 3 of port `count`.

/// Returns everything after the first `^`, or the whole name.
pub fn pin_name(name: &str) -> &str {
    match name.split_once('^') {
        Some((_, rest)) => rest,
        None => name,
    }
}

/// Returns the port name: the pin name with any `~bit` suffix removed.
pub fn port_name(name: &str) -> &str {
    let pin = pin_name(name);
    match pin.split_once('~') {
        Some((port, _)) => port,
        None => pin,
    }
}

/// Returns the bit index after `~`, or `None` when the name has no index.
///
/// Non-numeric suffixes read as bit 0.
pub fn pin_number(name: &str) -> Option<u32> {
    let (_, suffix) = pin_name(name).split_once('~')?;
    let digits: String = suffix.chars().take_while(char::is_ascii_digit).collect();
    Some(digits.parse().unwrap_or(0))
}

/// Returns the hard-block model name: the text after the first `.`, without
/// any `~instance` suffix. `None` if the name has no `.`.
pub fn hard_block_model(name: &str) -> Option<&str> {
    let (_, model) = name.split_once('.')?;
    let model = model.split_once('~').map_or(model, |(m, _)| m);
    (!model.is_empty()).then_some(model)
}

/// Returns the memory-initialization file stem: the text after the last `+`.
pub fn memory_file_stem(name: &str) -> &str {
    name.rsplit_once('+').map_or(name, |(_, stem)| stem)
}

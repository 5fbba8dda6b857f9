// Echo to stderr without ever panicking.
//
// GUI builds may run with no console attached; `eprintln!` panics when the
// write fails, and a panic from inside the logger or the panic hook can
// recurse. Write errors are dropped instead.

#[macro_export]
macro_rules! safe_eprintln {
    ($($arg:tt)*) => {{
        use std::io::Write;
        let _ = writeln!(std::io::stderr(), $($arg)*);
    }};
}

#[macro_export]
macro_rules! safe_eprint {
    ($($arg:tt)*) => {{
        use std::io::Write;
        let _ = write!(std::io::stderr(), $($arg)*);
    }};
}

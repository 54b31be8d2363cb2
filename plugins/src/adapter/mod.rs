mod replay;

pub use replay::ReplayAdapter;

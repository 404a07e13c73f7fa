/// Element symbols indexed by atomic number, 1–118. Index 0 is a dummy.
static SYMBOLS: [&str; 119] = [
    "", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge",
    "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd",
    "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd",
    "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm",
    "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg",
    "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Looks up the atomic number for a case-sensitive element symbol.
pub fn atomic_num(symbol: &str) -> Option<u8> {
    SYMBOLS
        .iter()
        .position(|&s| s == symbol && !s.is_empty())
        .map(|i| i as u8)
}

/// Canonical symbol for an atomic number, if in range.
pub fn symbol(atomic_num: u8) -> Option<&'static str> {
    match SYMBOLS.get(atomic_num as usize) {
        Some(&s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Elements writable in lowercase as aromatic inside a bracket atom.
pub fn aromatic_symbol(lower: &str) -> Option<&'static str> {
    match lower {
        "c" => Some("C"),
        "n" => Some("N"),
        "o" => Some("O"),
        "s" => Some("S"),
        "p" => Some("P"),
        "se" => Some("Se"),
        "as" => Some("As"),
        "te" => Some("Te"),
        _ => None,
    }
}

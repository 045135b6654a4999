
// Instruments driven over the Transport trait.  The DS2102A is the only one so far; others would get their own
// module here, grouped by manufacturer if that ever becomes more than one

pub mod ds2102a;

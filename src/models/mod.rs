pub mod jobmodel;
pub mod materialmodel;
pub mod paymentmodel;
pub mod usermodel;

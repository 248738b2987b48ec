pub(crate) mod depth;
pub(crate) mod inpaint;
pub(crate) mod session;
pub(crate) mod tensor;

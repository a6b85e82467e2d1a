mod protocol;
mod supervisor;
mod worker;

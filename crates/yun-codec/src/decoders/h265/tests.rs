mod helpers;

mod regions;

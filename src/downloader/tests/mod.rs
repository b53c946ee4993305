mod batch_unit;
